use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};

use shelf_config::DatabaseSettings;

pub mod books;
pub mod cart;
pub mod orders;
pub mod stats;
pub mod users;

pub use orders::{OrderError, OrderManager};

pub const ENV_DB_URL: &str = "SHELF_DATABASE_URL";

/// Connect to Postgres with pool limits taken from settings.
pub async fn connect(url: &str, settings: &DatabaseSettings) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(Duration::from_millis(settings.acquire_timeout_ms))
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Connect to Postgres using SHELF_DATABASE_URL and default pool limits.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL)
        .with_context(|| format!("missing env var {ENV_DB_URL}"))?;
    connect(&url, &DatabaseSettings::default()).await
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Simple status query (connectivity + schema presence).
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;
    let ok = one == 1;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='orders'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok,
        has_orders_table: exists,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_orders_table: bool,
}

// ---------------------------------------------------------------------------
// Failure classification
// ---------------------------------------------------------------------------

/// Caller input rejected before any statement ran.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct InvalidInput(pub String);

/// What a failed store call means to a caller that has to pick a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    Invalid(String),
    /// SQLSTATE 23505
    Unique { constraint: Option<String> },
    /// SQLSTATE 23503
    ForeignKey { constraint: Option<String> },
    /// SQLSTATE 23514
    Check { constraint: Option<String> },
}

/// Walk the error chain looking for [`InvalidInput`] or a Postgres
/// integrity violation. Anything else is `None` (an internal failure).
pub fn classify(err: &anyhow::Error) -> Option<Violation> {
    for cause in err.chain() {
        if let Some(invalid) = cause.downcast_ref::<InvalidInput>() {
            return Some(Violation::Invalid(invalid.0.clone()));
        }
        if let Some(db) = cause.downcast_ref::<sqlx::Error>() {
            return classify_sqlx(db);
        }
    }
    None
}

pub fn classify_sqlx(err: &sqlx::Error) -> Option<Violation> {
    let sqlx::Error::Database(db_err) = err else {
        return None;
    };
    let constraint = db_err.constraint().map(str::to_string);
    match db_err.code().as_deref() {
        Some("23505") => Some(Violation::Unique { constraint }),
        Some("23503") => Some(Violation::ForeignKey { constraint }),
        Some("23514") => Some(Violation::Check { constraint }),
        _ => None,
    }
}

/// Detect a Postgres unique constraint violation by name.
pub(crate) fn is_unique_constraint_violation(err: &sqlx::Error, constraint: &str) -> bool {
    matches!(
        classify_sqlx(err),
        Some(Violation::Unique { constraint: Some(c) }) if c == constraint
    )
}

pub(crate) fn invalid(msg: impl Into<String>) -> anyhow::Error {
    anyhow::Error::new(InvalidInput(msg.into()))
}
