//! sko-daemon entry point.
//!
//! This file is intentionally thin: it sets up tracing, loads config,
//! builds the shared state, wires middleware, and starts the HTTP
//! server. All route handlers live in `routes.rs`; all shared state
//! types live in `state.rs`.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use sko_daemon::{routes, state};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env.local if present (dev convenience). Silent if the file
    // does not exist — production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let config = load_config()?;

    let pool = sko_db::connect_from_env().await?;
    sko_db::migrate(&pool).await?;

    let service = match &config.journal_path {
        Some(path) => {
            let journal = sko_audit::JournalWriter::resume(path, true)?;
            sko_pantry::PantryService::with_journal(pool, journal)
        }
        None => sko_pantry::PantryService::new(pool),
    };

    let shared = Arc::new(state::AppState::new(service));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = bind_addr(&config).unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8790)));
    info!("sko-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// Config layers: `SKO_CONFIG` names the base file, `SKO_CONFIG_LOCAL`
/// an optional override. No file at all means defaults.
fn load_config() -> anyhow::Result<sko_config::AppConfig> {
    let mut paths: Vec<String> = Vec::new();
    if let Ok(p) = std::env::var("SKO_CONFIG") {
        paths.push(p);
    }
    if let Ok(p) = std::env::var("SKO_CONFIG_LOCAL") {
        paths.push(p);
    }
    if paths.is_empty() {
        return Ok(sko_config::AppConfig::default());
    }

    let refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = sko_config::load_layered_yaml(&refs)?;
    info!(config_hash = %loaded.config_hash, "config loaded");
    Ok(loaded.config)
}

fn bind_addr(config: &sko_config::AppConfig) -> Option<SocketAddr> {
    if let Ok(addr) = std::env::var("SKO_DAEMON_ADDR") {
        return addr.parse().ok();
    }
    config.daemon.bind_addr.as_ref()?.parse().ok()
}

/// CORS: allow only localhost origins.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}
