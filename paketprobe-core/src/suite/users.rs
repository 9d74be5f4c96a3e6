use serde_json::Value;

use super::{Aborted, Recorder, StepResult, run_stamp};
use crate::api::{ApiClient, PasswordChange, ProfileUpdate, Registration};

const PASSWORD: &str = "crud-password-123";
const NEW_PASSWORD: &str = "crud-new-password-123";

pub(super) async fn run(client: &ApiClient, rec: &mut Recorder) -> Result<(), Aborted> {
    let stamp = run_stamp();
    let email = format!("crud_user_{stamp}@example.com");

    let name = "Health Check";
    let health = rec.call(name, client.health().await)?;
    rec.record(StepResult::expect_success(name, &health));

    let name = "User Registration";
    let registration = Registration {
        username: format!("crud_user_{stamp}"),
        email: email.clone(),
        password: PASSWORD.to_string(),
        full_name: "CRUD Test User".to_string(),
    };
    let registered = rec.call(name, client.register(&registration).await)?;
    let mut session = registered.session.clone();
    if registered.reply.success() {
        rec.record(
            StepResult::expect_success(name, &registered.reply)
                .with_detail(format!("test user email: {email}")),
        );
    } else {
        // The account may already exist from an earlier run.
        let existing = rec.call(name, client.login(&email, PASSWORD).await)?;
        session = existing.session.clone();
        rec.record(
            StepResult::check(
                name,
                "success (or login of existing user)",
                existing.reply.describe(),
                existing.reply.success(),
            )
            .with_detail(format!(
                "registration failed ({}), fell back to login",
                registered.reply.describe()
            )),
        );
    }

    if session.is_none() {
        let name = "User Login";
        let login = rec.call(name, client.login(&email, PASSWORD).await)?;
        rec.record(StepResult::expect_success(name, &login.reply));
        session = login.session;
    }

    let Some(mut session) = session else {
        return Err(rec.abort("Get User Profile", "no session: registration and login failed"));
    };

    let name = "Get User Profile";
    let profile = rec.call(name, client.profile(&session).await)?;
    let data = profile.data();
    rec.record(StepResult::expect_success(name, &profile).with_detail(format!(
        "username: {}, email: {}",
        str_field(data, "username"),
        str_field(data, "email")
    )));

    let name = "Update User Profile";
    let update = ProfileUpdate {
        username: Some(format!("updated_user_{stamp}")),
        full_name: Some("Updated CRUD Test User".to_string()),
    };
    let updated = rec.call(name, client.update_profile(&session, &update).await)?;
    rec.record(StepResult::expect_success(name, &updated));

    let name = "Verify Profile Update";
    let verify = rec.call(name, client.profile(&session).await)?;
    let data = verify.data();
    rec.record(StepResult::expect_success(name, &verify).with_detail(format!(
        "username: {}, full name: {}",
        str_field(data, "username"),
        str_field(data, "full_name")
    )));

    let name = "Change Password";
    let change = PasswordChange {
        current_password: PASSWORD.to_string(),
        new_password: NEW_PASSWORD.to_string(),
    };
    let changed = rec.call(name, client.change_password(&session, &change).await)?;
    rec.record(StepResult::expect_success(name, &changed));

    let name = "Login with New Password";
    let relogin = rec.call(name, client.login(&email, NEW_PASSWORD).await)?;
    rec.record(StepResult::expect_success(name, &relogin.reply));
    if let Some(fresh) = relogin.session {
        session = fresh;
    }

    let name = "Login with Old Password (Should Fail)";
    let old = rec.call(name, client.login(&email, PASSWORD).await)?;
    rec.record(StepResult::expect_failure(name, &old.reply));

    let name = "Delete User Account";
    let deleted = rec.call(name, client.delete_account(&session).await)?;
    rec.record(StepResult::expect_success(name, &deleted));

    let name = "Login Deleted User (Should Fail)";
    let gone = rec.call(name, client.login(&email, NEW_PASSWORD).await)?;
    rec.record(StepResult::expect_failure(name, &gone.reply));

    Ok(())
}

fn str_field<'a>(data: &'a Value, key: &str) -> &'a str {
    data.get(key).and_then(Value::as_str).unwrap_or("-")
}
