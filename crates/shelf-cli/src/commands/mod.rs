//! Command handler modules for the `shelf` CLI.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod order;
pub mod user;

use anyhow::Result;
use sqlx::PgPool;

use shelf_config::{resolve_secrets, ShelfSettings};

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Load settings from `--config` layers (defaults when none), resolve the
/// database URL from the env var they name, and connect.
pub async fn connect(config_paths: &[String]) -> Result<(PgPool, ShelfSettings)> {
    let path_refs: Vec<&str> = config_paths.iter().map(String::as_str).collect();
    let (settings, _) = ShelfSettings::load(&path_refs)?;
    let secrets = resolve_secrets(&settings)?;
    let pool = shelf_db::connect(&secrets.database_url, &settings.database).await?;
    Ok((pool, settings))
}
