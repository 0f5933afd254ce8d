//! Shared state for shelf-daemon handlers.
//!
//! Handlers receive `State<Arc<AppState>>`. The pool is the only shared
//! resource; there are no in-process locks or caches.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use shelf_config::ShelfSettings;
use shelf_db::OrderManager;

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in health responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            service: "shelf-daemon",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    /// Checkout transactions; holds its own handle to the same pool.
    pub orders: OrderManager,
    pub build: BuildInfo,
}

impl AppState {
    pub fn new(pool: PgPool, settings: &ShelfSettings) -> Self {
        Self {
            orders: OrderManager::from_settings(pool.clone(), settings),
            pool,
            build: BuildInfo::default(),
        }
    }
}
