//! Accounts: registration, password check, admin CRUD.
//!
//! Passwords are stored as Argon2id PHC strings. The hash column is never
//! selected into [`User`], so it cannot leak into a response.

use anyhow::{anyhow, Context, Result};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use shelf_schemas::{NewUser, User, UserId, UserUpdate};

use crate::is_unique_constraint_violation;

const UQ_USERNAME: &str = "uq_users_username";
const UQ_EMAIL: &str = "uq_users_email";

/// Result of [`register`]. Taken names are expected outcomes, not errors.
#[derive(Debug, Clone, PartialEq)]
pub enum Registration {
    Created(User),
    EmailTaken,
    UsernameTaken,
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("password hashing failed: {e}"))?;
    Ok(phc.to_string())
}

/// False for a wrong password and for a malformed stored hash alike.
pub fn verify_password(password: &str, phc: &str) -> bool {
    match PasswordHash::new(phc) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

fn user_from_row(row: &PgRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        is_admin: row.try_get("is_admin")?,
        created_at: row.try_get("created_at")?,
    })
}

async fn exists(pool: &PgPool, column: &str, value: &str) -> Result<bool> {
    let (found,): (bool,) = sqlx::query_as(&format!(
        "select exists (select 1 from users where {column} = $1)"
    ))
    .bind(value)
    .fetch_one(pool)
    .await
    .with_context(|| format!("users {column} lookup failed"))?;
    Ok(found)
}

pub async fn register(pool: &PgPool, new_user: &NewUser) -> Result<Registration> {
    let username = new_user.username.trim();
    let email = new_user.email.trim();
    if username.is_empty() || email.is_empty() || new_user.password.is_empty() {
        return Err(crate::invalid("username, email and password are required"));
    }

    if exists(pool, "email", email).await? {
        return Ok(Registration::EmailTaken);
    }
    if exists(pool, "username", username).await? {
        return Ok(Registration::UsernameTaken);
    }

    let password_hash = hash_password(&new_user.password)?;

    let res = sqlx::query(
        r#"
        insert into users (username, email, password_hash, is_admin)
        values ($1, $2, $3, $4)
        returning id, username, email, is_admin, created_at
        "#,
    )
    .bind(username)
    .bind(email)
    .bind(&password_hash)
    .bind(new_user.is_admin)
    .fetch_one(pool)
    .await;

    match res {
        Ok(row) => Ok(Registration::Created(user_from_row(&row)?)),
        // Lost a race with a concurrent registration for the same name.
        Err(e) if is_unique_constraint_violation(&e, UQ_EMAIL) => Ok(Registration::EmailTaken),
        Err(e) if is_unique_constraint_violation(&e, UQ_USERNAME) => {
            Ok(Registration::UsernameTaken)
        }
        Err(e) => Err(anyhow::Error::new(e).context("insert user failed")),
    }
}

/// Look up by email first, then by username, and verify the password.
/// `None` covers both an unknown login and a wrong password.
pub async fn authenticate(pool: &PgPool, login: &str, password: &str) -> Result<Option<User>> {
    let login = login.trim();
    if login.is_empty() || password.is_empty() {
        return Err(crate::invalid("username and password are required"));
    }

    let mut row = None;
    for column in ["email", "username"] {
        row = sqlx::query(&format!(
            "select id, username, email, is_admin, created_at, password_hash \
             from users where {column} = $1 limit 1"
        ))
        .bind(login)
        .fetch_optional(pool)
        .await
        .context("login lookup failed")?;
        if row.is_some() {
            break;
        }
    }

    let Some(row) = row else {
        return Ok(None);
    };
    let phc: String = row.try_get("password_hash")?;
    if !verify_password(password, &phc) {
        return Ok(None);
    }
    Ok(Some(user_from_row(&row)?))
}

/// All users, newest first.
pub async fn list_users(pool: &PgPool) -> Result<Vec<User>> {
    let rows = sqlx::query(
        "select id, username, email, is_admin, created_at from users order by created_at desc, id desc",
    )
    .fetch_all(pool)
    .await
    .context("list_users failed")?;

    rows.iter().map(user_from_row).collect()
}

pub async fn fetch_user(pool: &PgPool, id: UserId) -> Result<Option<User>> {
    let row = sqlx::query("select id, username, email, is_admin, created_at from users where id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("fetch_user failed")?;

    row.as_ref().map(user_from_row).transpose()
}

/// Unique violations propagate so the caller can answer with a conflict.
pub async fn update_user(pool: &PgPool, id: UserId, update: &UserUpdate) -> Result<bool> {
    if update.username.trim().is_empty() || update.email.trim().is_empty() {
        return Err(crate::invalid("username and email are required"));
    }

    let res = sqlx::query(
        r#"
        update users
        set username = $2,
            email = $3,
            is_admin = $4
        where id = $1
        "#,
    )
    .bind(id)
    .bind(update.username.trim())
    .bind(update.email.trim())
    .bind(update.is_admin)
    .execute(pool)
    .await
    .context("update_user failed")?;

    Ok(res.rows_affected() == 1)
}

/// Cart rows cascade; a user with orders cannot be deleted (foreign-key violation).
pub async fn delete_user(pool: &PgPool, id: UserId) -> Result<bool> {
    let res = sqlx::query("delete from users where id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("delete_user failed")?;

    Ok(res.rows_affected() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_verifies_only_the_original_password() {
        let phc = hash_password("correct horse").unwrap();
        assert!(phc.starts_with("$argon2"));
        assert!(verify_password("correct horse", &phc));
        assert!(!verify_password("battery staple", &phc));
    }

    #[test]
    fn same_password_hashes_differently() {
        let a = hash_password("pw").unwrap();
        let b = hash_password("pw").unwrap();
        assert_ne!(a, b, "salts must differ");
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("pw", "not-a-phc-string"));
        assert!(!verify_password("pw", ""));
    }
}
