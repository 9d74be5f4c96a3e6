use serde_json::Value;

use super::{Aborted, Recorder, StepResult, data_len, run_stamp};
use crate::api::{ApiClient, FavoriteRequest, NewPaket, PaketQuery, Registration, Session};

const PASSWORD: &str = "compat-password-123";

/// Walks the paket, user and favorites endpoints once, keyed by the hash of a
/// freshly created paket rather than a numeric id.
pub(super) async fn run(client: &ApiClient, rec: &mut Recorder) -> Result<(), Aborted> {
    let stamp = run_stamp();

    let name = "Health Check";
    let health = rec.call(name, client.health().await)?;
    rec.record(StepResult::expect_success(name, &health));

    let name = "API Documentation";
    let docs = rec.call(name, client.api_docs().await)?;
    let endpoints = docs
        .body
        .get("endpoints")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    rec.record(
        StepResult::expect_success(name, &docs).with_detail(format!("documented endpoints: {endpoints}")),
    );

    let name = "Get All Paket";
    let all = rec.call(name, client.list_paket(&PaketQuery::default()).await)?;
    let has_hash = first_row_has_hash(&all);
    rec.record(StepResult::expect_success(name, &all).with_detail(format!(
        "paket records: {}, md5_hash field present: {has_hash}",
        data_len(&all)
    )));

    let name = "Create Paket with Hash";
    let paket = NewPaket {
        file_name: "compatibility_test.pdf".to_string(),
        md5_hash: format!("compat_hash_{stamp}"),
        tanggal_pembuatan: "2024-01-15".to_string(),
        tanggal_penutupan: Some("2024-02-15".to_string()),
        nilai_hps_paket: 90_000_000.0,
        ..NewPaket::with_defaults("Compatibility Test Paket", format!("PCT{stamp}"), 100_000_000.0, stamp)
    };
    let created = rec.call(name, client.create_paket(&paket).await)?;
    let created_id = created
        .success()
        .then(|| created.data().get("id").and_then(Value::as_u64))
        .flatten();
    let created_hash = created_id.map(|_| {
        created
            .data()
            .get("md5_hash")
            .and_then(Value::as_str)
            .unwrap_or(paket.md5_hash.as_str())
            .to_string()
    });
    let mut step = StepResult::check(name, "success with new id", created.describe(), created_id.is_some());
    if let (Some(id), Some(hash)) = (created_id, &created_hash) {
        step = step.with_detail(format!("created paket id: {id}, md5_hash: {hash}"));
    }
    rec.record(step);

    let name = "User Registration";
    let email = format!("compat_test_{stamp}@example.com");
    let registration = Registration {
        username: format!("compat_test_{stamp}"),
        email: email.clone(),
        password: PASSWORD.to_string(),
        full_name: "Compatibility Test User".to_string(),
    };
    let registered = rec.call(name, client.register(&registration).await)?;
    let session = match registered.session {
        Some(session) => {
            rec.record(StepResult::expect_success(name, &registered.reply));
            Some(session)
        }
        None => {
            let login = rec.call(name, client.login(&email, PASSWORD).await)?;
            rec.record(
                StepResult::check(
                    name,
                    "registered or logged in",
                    login.reply.describe(),
                    login.session.is_some(),
                )
                .with_detail(format!("registration: {}", registered.reply.describe())),
            );
            login.session
        }
    };

    if let (Some(session), Some(hash)) = (&session, &created_hash) {
        favorites_by_hash(client, rec, session, hash).await?;
    }

    if let Some(id) = created_id {
        let name = "Delete Created Paket";
        let deleted = rec.call(name, client.delete_paket(id).await)?;
        rec.record(StepResult::expect_success(name, &deleted));
    }

    let name = "Delete Test User";
    match &session {
        Some(session) => {
            let deleted = rec.call(name, client.delete_account(session).await)?;
            rec.record(StepResult::expect_success(name, &deleted));
        }
        None => {
            rec.record(StepResult::check(name, "success", "no session for test user", false));
        }
    }
    Ok(())
}

async fn favorites_by_hash(
    client: &ApiClient,
    rec: &mut Recorder,
    session: &Session,
    md5_hash: &str,
) -> Result<(), Aborted> {
    let name = "Add Favorite by Hash";
    let request = FavoriteRequest {
        md5_hash: md5_hash.to_string(),
        notes: Some("Compatibility test favorite".to_string()),
    };
    let added = rec.call(name, client.add_favorite(session, &request).await)?;
    if !rec.record(StepResult::expect_success(name, &added)) {
        return Ok(());
    }

    let name = "Check Favorite by Hash";
    let check = rec.call(name, client.check_favorite(session, md5_hash).await)?;
    let favorited = check
        .data()
        .get("is_favorite")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    rec.record(StepResult::check(
        name,
        "success with is_favorite=true",
        format!("{} is_favorite={favorited}", check.describe()),
        check.success() && favorited,
    ));

    let name = "Remove Favorite by Hash";
    let removed = rec.call(name, client.remove_favorite(session, md5_hash).await)?;
    rec.record(StepResult::expect_success(name, &removed));
    Ok(())
}

fn first_row_has_hash(reply: &crate::api::ApiReply) -> bool {
    reply
        .data()
        .as_array()
        .and_then(|rows| rows.first())
        .is_some_and(|row| row.get("md5_hash").is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiReply;
    use serde_json::json;

    #[test]
    fn hash_presence_looks_at_first_row_only() {
        let with = ApiReply {
            status: 200,
            body: json!({"success": true, "data": [{"id": 1, "md5_hash": "abc"}, {"id": 2}]}),
        };
        let without = ApiReply {
            status: 200,
            body: json!({"success": true, "data": [{"id": 1}]}),
        };
        let empty = ApiReply {
            status: 200,
            body: json!({"success": true, "data": []}),
        };
        assert!(first_row_has_hash(&with));
        assert!(!first_row_has_hash(&without));
        assert!(!first_row_has_hash(&empty));
    }
}
