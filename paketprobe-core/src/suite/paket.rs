use serde_json::{Map, Value};

use super::{Aborted, Recorder, StepResult, data_len, run_stamp};
use crate::api::{ApiClient, NewPaket, PaketQuery};

const MISSING_PAKET_ID: u64 = 99_999;

pub(super) async fn run(client: &ApiClient, rec: &mut Recorder) -> Result<(), Aborted> {
    let stamp = run_stamp();

    let name = "Health Check";
    let health = rec.call(name, client.health().await)?;
    rec.record(StepResult::expect_success(name, &health));

    let name = "Get All Paket (Initial)";
    let initial = rec.call(name, client.list_paket(&PaketQuery::default()).await)?;
    let initial_count = data_len(&initial);
    rec.record(
        StepResult::expect_success(name, &initial)
            .with_detail(format!("initial paket count: {initial_count}")),
    );

    let name = "Search Paket";
    let search = rec.call(name, client.list_paket(&PaketQuery::search("Laptop")).await)?;
    rec.record(
        StepResult::expect_success(name, &search)
            .with_detail(format!("search results: {} items", data_len(&search))),
    );

    let name = "Create Paket";
    let paket = NewPaket {
        md5_hash: format!("crud_hash_{stamp}"),
        file_name: "crud_test_paket.pdf".to_string(),
        tanggal_pembuatan: "2024-01-15".to_string(),
        tanggal_penutupan: Some("2024-02-15".to_string()),
        nilai_hps_paket: 67_500_000.0,
        ..NewPaket::with_defaults("CRUD Test Paket", "CTP001", 75_000_000.0, stamp)
    };
    let created = rec.call(name, client.create_paket(&paket).await)?;
    let created_id = created
        .success()
        .then(|| created.data().get("id").and_then(Value::as_u64))
        .flatten();
    let mut step = StepResult::check(
        name,
        "success with new id",
        created.describe(),
        created_id.is_some(),
    );
    if let Some(id) = created_id {
        step = step.with_detail(format!("created paket id: {id}"));
    }
    rec.record(step);

    if let Some(id) = created_id {
        let name = "Get Paket by ID";
        let fetched = rec.call(name, client.get_paket(id).await)?;
        rec.record(StepResult::expect_success(name, &fetched));

        let name = "Update Paket";
        let mut fields = Map::new();
        fields.insert("nama_paket".into(), Value::from("Updated CRUD Test Paket"));
        fields.insert("nilai_pagu_paket".into(), Value::from(85_000_000));
        fields.insert("nilai_hps_paket".into(), Value::from(76_500_000));
        fields.insert("lokasi_pekerjaan".into(), Value::from("Bandung"));
        let updated = rec.call(name, client.update_paket(id, &fields).await)?;
        rec.record(StepResult::expect_success(name, &updated));
    }

    let name = "Get All Paket (After Create)";
    let after = rec.call(name, client.list_paket(&PaketQuery::default()).await)?;
    let final_count = data_len(&after);
    let mut detail = format!("final paket count: {final_count}");
    if created_id.is_some() {
        detail.push_str(&format!(", count increased: {}", final_count > initial_count));
    }
    rec.record(StepResult::expect_success(name, &after).with_detail(detail));

    let name = "Get Non-Existent Paket (Should Fail)";
    let missing = rec.call(name, client.get_paket(MISSING_PAKET_ID).await)?;
    rec.record(StepResult::expect_failure(name, &missing));

    if let Some(id) = created_id {
        let name = "Delete Paket";
        let deleted = rec.call(name, client.delete_paket(id).await)?;
        rec.record(StepResult::expect_success(name, &deleted));

        let name = "Verify Deletion";
        let gone = rec.call(name, client.get_paket(id).await)?;
        rec.record(StepResult::expect_failure(name, &gone));
    }

    Ok(())
}
