//! tactical-server – entry point.
//!
//! Startup order:
//! 1. Load `.env` (if present) and parse configuration from environment variables.
//! 2. Initialise structured tracing (JSON in production, pretty in dev).
//! 3. Resolve the OpenRouter API key; refuse to start without one.
//! 4. Build the shared state: model catalog cache, conversation assembler,
//!    session registry.
//! 5. Build the Axum router and start the HTTP server with graceful shutdown.

mod config;
mod error;
mod middleware;
mod routes;
mod schemas;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tactical_core::{CatalogCache, ConversationAssembler, OpenRouterClient};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::state::{AppState, SessionRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    dotenv::dotenv().ok();
    let cfg = Config::from_env();

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: TACOPS_LOG='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.log_level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true);

    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "tactical-server starting");

    // ── 3. Credentials ─────────────────────────────────────────────────────────
    let api_key = match tactical_core::secrets::resolve_api_key(&cfg.secrets_file) {
        Ok(key) => key,
        Err(e) => {
            error!(secrets_file = %cfg.secrets_file.display(), error = %e, "no usable API key");
            return Err(e).context("an OpenRouter API key is required to start");
        }
    };

    // ── 4. Shared application state ────────────────────────────────────────────
    let client = Arc::new(
        OpenRouterClient::new(api_key)
            .set_base_url(cfg.api_base.clone())
            .set_referer(cfg.referer.clone())
            .set_title(cfg.title.clone()),
    );
    info!(api_base = %client.base_url(), "OpenRouter client ready");

    let state = Arc::new(AppState {
        config: Arc::new(cfg.clone()),
        catalog: Arc::new(CatalogCache::new(client.clone(), cfg.catalog_ttl)),
        assembler: ConversationAssembler::new(client),
        sessions: Arc::new(SessionRegistry::new()),
    });

    // ── 5. HTTP server with graceful shutdown ──────────────────────────────────
    let app = routes::build(Arc::clone(&state));
    let addr: SocketAddr = cfg
        .bind_address
        .parse()
        .with_context(|| format!("invalid TACOPS_BIND '{}'", cfg.bind_address))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!(sessions = state.sessions.len().await, "tactical-server stopped");
    Ok(())
}

/// Returns a future that resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
