use serde_json::Value;

use super::{Aborted, Recorder, StepResult, data_len, run_stamp};
use crate::api::{ApiClient, ApiReply, FavoriteRequest, Registration, Session};

const PASSWORD: &str = "favorites-password-123";

/// Hashes of paket rows expected to exist on the target.
pub const SAMPLE_MD5_HASHES: [&str; 2] = [
    "032477c9bdd128dd1e1c3b3b7fe283f4",
    "1366f6f446e18cd51b472f28fdc42b2d",
];

const UNKNOWN_MD5_HASH: &str = "nonexistent_hash_12345";

pub(super) async fn run(client: &ApiClient, rec: &mut Recorder) -> Result<(), Aborted> {
    let stamp = run_stamp();
    let email = format!("crud_fav_{stamp}@example.com");
    let [first_hash, second_hash] = SAMPLE_MD5_HASHES;

    let name = "Setup: Authenticate Test User";
    let registration = Registration {
        username: format!("crud_fav_{stamp}"),
        email: email.clone(),
        password: PASSWORD.to_string(),
        full_name: "Favorites Test User".to_string(),
    };
    let registered = rec.call(name, client.register(&registration).await)?;
    let session = match registered.session {
        Some(session) => session,
        None => {
            let login = rec.call(name, client.login(&email, PASSWORD).await)?;
            match login.session {
                Some(session) => session,
                None => return Err(rec.abort(name, "cannot create or login test user")),
            }
        }
    };

    let name = "Health Check";
    let health = rec.call(name, client.health().await)?;
    rec.record(StepResult::expect_success(name, &health));

    let name = "Get All Favorites (Initial)";
    let initial = rec.call(name, client.favorites(&session).await)?;
    rec.record(
        StepResult::expect_success(name, &initial)
            .with_detail(format!("initial favorites count: {}", favorites_count(&initial))),
    );

    let name = "Add to Favorites";
    let added = rec.call(
        name,
        client
            .add_favorite(&session, &favorite(first_hash, Some("Test favorite")))
            .await,
    )?;
    rec.record(StepResult::expect_success(name, &added));

    let name = "Check Favorite Status";
    let check = rec.call(name, client.check_favorite(&session, first_hash).await)?;
    let favorited = is_favorite(&check);
    rec.record(StepResult::check(
        name,
        "success with is_favorite=true",
        format!("{} is_favorite={favorited}", check.describe()),
        check.success() && favorited,
    ));

    let name = "Add Duplicate Favorite (Should Fail)";
    let duplicate = rec.call(
        name,
        client.add_favorite(&session, &favorite(first_hash, None)).await,
    )?;
    rec.record(StepResult::expect_failure(name, &duplicate));

    let name = "Get Favorites Statistics";
    let stats = rec.call(name, client.favorites_stats(&session).await)?;
    let data = stats.data();
    rec.record(StepResult::expect_success(name, &stats).with_detail(format!(
        "total favorites: {}, recent favorites: {}",
        data.get("total_favorites").unwrap_or(&Value::Null),
        data.get("recent_favorites").unwrap_or(&Value::Null)
    )));

    let name = "Add More Favorites";
    let more = rec.call(
        name,
        client
            .add_favorite(&session, &favorite(second_hash, Some("Second test favorite")))
            .await,
    )?;
    rec.record(StepResult::expect_success(name, &more));

    let name = "Get All Favorites (After Adding)";
    let after = rec.call(name, client.favorites(&session).await)?;
    rec.record(
        StepResult::expect_success(name, &after)
            .with_detail(format!("final favorites count: {}", favorites_count(&after))),
    );

    let name = "Remove Specific Favorite";
    let removed = rec.call(name, client.remove_favorite(&session, first_hash).await)?;
    rec.record(StepResult::expect_success(name, &removed));

    let name = "Check Removed Favorite Status";
    let check = rec.call(name, client.check_favorite(&session, first_hash).await)?;
    let still_favorite = is_favorite(&check);
    rec.record(StepResult::check(
        name,
        "success with is_favorite=false",
        format!("{} is_favorite={still_favorite}", check.describe()),
        check.success() && !still_favorite,
    ));

    let name = "Add Non-Existent Paket (Should Fail)";
    let unknown = rec.call(
        name,
        client
            .add_favorite(&session, &favorite(UNKNOWN_MD5_HASH, None))
            .await,
    )?;
    rec.record(StepResult::expect_failure(name, &unknown));

    let name = "Clear All Favorites";
    let cleared = rec.call(name, client.clear_favorites(&session).await)?;
    let mut step = StepResult::expect_success(name, &cleared);
    if let Some(message) = cleared.message() {
        step = step.with_detail(message);
    }
    rec.record(step);

    let name = "Verify All Favorites Cleared";
    let verify = rec.call(name, client.favorites(&session).await)?;
    let remaining = favorites_count(&verify);
    rec.record(StepResult::check(
        name,
        "success with count=0",
        format!("{} count={remaining}", verify.describe()),
        verify.success() && remaining == 0,
    ));

    cleanup(client, &session).await;
    Ok(())
}

async fn cleanup(client: &ApiClient, session: &Session) {
    match client.delete_account(session).await {
        Ok(reply) if reply.success() => tracing::debug!("favorites test user deleted"),
        Ok(reply) => tracing::warn!(reply = %reply.describe(), "failed to delete favorites test user"),
        Err(err) => tracing::warn!(error = %err, "failed to delete favorites test user"),
    }
}

fn favorite(md5_hash: &str, notes: Option<&str>) -> FavoriteRequest {
    FavoriteRequest {
        md5_hash: md5_hash.to_string(),
        notes: notes.map(str::to_string),
    }
}

/// `count` when present, else the length of `data`.
fn favorites_count(reply: &ApiReply) -> u64 {
    reply
        .body
        .get("count")
        .and_then(Value::as_u64)
        .unwrap_or(data_len(reply) as u64)
}

fn is_favorite(reply: &ApiReply) -> bool {
    reply
        .data()
        .get("is_favorite")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}
