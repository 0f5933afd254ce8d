//! shelf-daemon entry point.
//!
//! Thin on purpose: load config, resolve secrets, connect and migrate, wire
//! middleware, serve. Handlers live in `routes.rs`, shared state in `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use shelf_config::{resolve_secrets, ShelfSettings};
use shelf_daemon::{routes, state};
use tower_http::{
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

/// Comma-separated YAML paths, merged left to right.
const ENV_CONFIG_PATHS: &str = "SHELF_CONFIG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let paths = config_paths_from_env();
    let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    let (settings, loaded) = ShelfSettings::load(&path_refs)?;
    info!(config_hash = %loaded.config_hash, layers = paths.len(), "config loaded");

    let secrets = resolve_secrets(&settings)?;
    let pool = shelf_db::connect(&secrets.database_url, &settings.database).await?;
    shelf_db::migrate(&pool).await?;

    let shared = Arc::new(state::AppState::new(pool, &settings));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(TimeoutLayer::new(Duration::from_millis(
            settings.server.request_timeout_ms,
        )))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors(&settings.server.cors_origins));

    let addr: SocketAddr = settings
        .server
        .addr
        .parse()
        .with_context(|| format!("invalid server.addr '{}'", settings.server.addr))?;
    info!("shelf-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    shared.pool.close().await;
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn config_paths_from_env() -> Vec<String> {
    std::env::var(ENV_CONFIG_PATHS)
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}

/// CORS: allow only the configured browser origins.
fn cors(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(tower_http::cors::Any)
}
