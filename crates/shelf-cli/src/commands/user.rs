//! `shelf user create-admin`: bootstrap an administrator account.
//!
//! The password is read from an environment variable so it never shows up
//! in shell history or the process list.

use anyhow::{bail, Result};
use sqlx::PgPool;

use shelf_db::users::{self, Registration};
use shelf_schemas::NewUser;

pub const ENV_ADMIN_PASSWORD: &str = "SHELF_ADMIN_PASSWORD";

pub async fn create_admin(pool: &PgPool, username: &str, email: &str) -> Result<()> {
    let password = match std::env::var(ENV_ADMIN_PASSWORD) {
        Ok(v) if !v.is_empty() => v,
        _ => bail!("{ENV_ADMIN_PASSWORD} must be set to the new admin's password"),
    };

    let reg = users::register(
        pool,
        &NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password,
            is_admin: true,
        },
    )
    .await?;

    match reg {
        Registration::Created(user) => {
            println!("created=true user_id={} username={} is_admin=true", user.id, user.username);
            Ok(())
        }
        Registration::EmailTaken => bail!("email already registered: {email}"),
        Registration::UsernameTaken => bail!("username already taken: {username}"),
    }
}
