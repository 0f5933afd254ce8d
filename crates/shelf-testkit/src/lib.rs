//! Shared helpers for DB-backed scenario tests.
//!
//! Scenarios call [`test_pool`] first and return early when it yields
//! `None`, so `cargo test` stays green on machines without Postgres.
//! Fixture rows get unique names so concurrent runs never collide.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use shelf_db::users::Registration;
use shelf_schemas::{Book, BookInput, NewUser, User};

/// Connect to SHELF_DATABASE_URL and apply migrations, or print a SKIP
/// line and return `None` when the variable is not set.
pub async fn test_pool(test_name: &str) -> Result<Option<PgPool>> {
    let url = match std::env::var(shelf_db::ENV_DB_URL) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => {
            eprintln!("SKIP: {test_name}: {} not set", shelf_db::ENV_DB_URL);
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(8)
        .connect(&url)
        .await
        .context("test pool connect failed")?;

    shelf_db::migrate(&pool).await?;
    Ok(Some(pool))
}

/// `prefix` plus a short random suffix.
pub fn unique(prefix: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{prefix}_{}", &id[..12])
}

pub async fn seed_user(pool: &PgPool) -> Result<User> {
    let name = unique("reader");
    let reg = shelf_db::users::register(
        pool,
        &NewUser {
            username: name.clone(),
            email: format!("{name}@example.test"),
            password: "secret-pw".to_string(),
            is_admin: false,
        },
    )
    .await?;

    match reg {
        Registration::Created(user) => Ok(user),
        other => anyhow::bail!("seed_user: unexpected {other:?}"),
    }
}

pub async fn seed_book(pool: &PgPool, price: Decimal, stock: i32) -> Result<Book> {
    let input = BookInput {
        title: unique("Title"),
        author: "Test Author".to_string(),
        year: Some(1999),
        description: "fixture".to_string(),
        price,
        stock,
        image_url: String::new(),
        category: "fiction".to_string(),
        isbn: unique("isbn"),
    };
    let id = shelf_db::books::insert_book(pool, &input).await?;
    shelf_db::books::fetch_book(pool, id)
        .await?
        .context("seeded book vanished")
}

/// A book id well past every existing row.
pub async fn missing_book_id(pool: &PgPool) -> Result<i64> {
    let (max,): (Option<i64>,) = sqlx::query_as("select max(id) from books")
        .fetch_one(pool)
        .await
        .context("max book id failed")?;
    Ok(max.unwrap_or(0) + 1_000_000)
}
