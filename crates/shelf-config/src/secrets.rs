//! Runtime secret resolution.
//!
//! # Contract
//! - Config YAML stores only env var NAMES (e.g. `database.url_env:
//!   "SHELF_DATABASE_URL"`).
//! - Binaries call [`resolve_secrets`] once at startup and pass the result
//!   into constructors; `std::env::var` is not scattered across crates.
//! - `Debug` redacts values and errors mention the NAME, never the value.

use anyhow::{bail, Result};

use crate::settings::ShelfSettings;

#[derive(Clone)]
pub struct ResolvedSecrets {
    /// Postgres connection URL.
    pub database_url: String,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("database_url", &"<REDACTED>")
            .finish()
    }
}

/// Resolve a named environment variable; blank counts as unset.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

pub fn resolve_secrets(settings: &ShelfSettings) -> Result<ResolvedSecrets> {
    let var = settings.database.url_env.trim();
    if var.is_empty() {
        bail!("SECRETS_MISSING: database.url_env is blank");
    }
    let Some(database_url) = resolve_env(var) else {
        bail!(
            "SECRETS_MISSING: required env var '{}' (database url) is not set or empty",
            var
        );
    };
    Ok(ResolvedSecrets { database_url })
}
