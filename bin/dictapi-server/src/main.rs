//! dictapi-server – entry point.
//!
//! Startup order:
//! 1. Parse configuration from environment variables, then CLI overrides.
//! 2. Initialise structured tracing (JSON in production, pretty in dev).
//! 3. Resolve upload limits and build the shared state.
//! 4. Build the Axum router and start the HTTP server with graceful shutdown.

mod config;
mod error;
mod fault;
mod handlers;
mod limits;
mod middleware;
mod multipart;
mod request;
mod routes;
mod state;
mod validation;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use dictapi_convert::BuiltinConverter;
use tracing::{info, warn};

use crate::config::Config;
use crate::limits::format_bytes;
use crate::state::AppState;

/// HTTP API converting dictionary files between formats.
#[derive(Debug, Parser)]
#[command(name = "dictapi-server", version, about)]
struct Cli {
    /// Address to listen on (overrides DICTAPI_BIND).
    #[arg(long)]
    bind: Option<String>,

    /// Tracing filter, e.g. "debug" (overrides DICTAPI_LOG).
    #[arg(long)]
    log: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    let cli = Cli::parse();
    let mut cfg = Config::from_env();
    if let Some(bind) = cli.bind {
        cfg.bind_address = bind;
    }
    if let Some(log) = cli.log {
        cfg.log_level = log;
    }

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    // Build the log-level filter, warning loudly if the configured value is
    // not a valid tracing filter expression.
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: DICTAPI_LOG='{}' is not a valid tracing filter ({}); \
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

    info!(version = env!("CARGO_PKG_VERSION"), "dictapi-server starting");

    // ── 3. Shared application state ────────────────────────────────────────────
    let state = Arc::new(AppState::new(cfg.clone(), Arc::new(BuiltinConverter)));
    info!(
        upload_limit = %format_bytes(state.upload_limit),
        upload_dir = %cfg.upload_dir.display(),
        input_encoding = state.codec.name(),
        "upload limits resolved"
    );

    // ── 4. HTTP server with graceful shutdown ──────────────────────────────────
    let app = routes::build(Arc::clone(&state));
    let addr: SocketAddr = cfg.bind_address.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("dictapi-server stopped");
    Ok(())
}

/// Returns a future that resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let installed = signal(SignalKind::terminate()).map(|mut s| async move {
            s.recv().await;
        });
        wait_for_signal("SIGTERM", installed).await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c   => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}

/// Wait for an installed signal. A handler that failed to install never fires.
#[cfg_attr(not(unix), allow(dead_code))]
async fn wait_for_signal<F: Future>(name: &str, installed: std::io::Result<F>) {
    match installed {
        Ok(received) => {
            received.await;
        }
        Err(e) => {
            warn!(signal = name, error = %e, "failed to install signal handler");
            std::future::pending::<()>().await;
        }
    }
}
