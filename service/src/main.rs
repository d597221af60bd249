//! `scoreazy-service` entry point.
//!
//! Loads configuration, opens the submission store, and serves the contact
//! and admin API until Ctrl+C / SIGTERM.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use scoreazy_core::config::ServiceConfig;
use scoreazy_core::notify::NotificationDispatcher;
use scoreazy_core::rate_guard::{RateGuard, SlidingWindowGuard};
use scoreazy_core::SubmissionStore;
use scoreazy_service::{AppState, router, spawn_rate_guard_sweeper};
use tokio::net::TcpListener;

#[derive(Debug, Parser)]
#[command(name = "scoreazy-service", version, about = "Scoreazy contact intake service")]
struct Args {
    /// Path to service.toml (overrides SCOREAZY_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address, e.g. 127.0.0.1:5000
    #[arg(long)]
    bind: Option<String>,

    /// SQLite database path
    #[arg(long)]
    db: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("scoreazy-service v{} starting", env!("CARGO_PKG_VERSION"));
    if let Ok(path) = dotenv {
        tracing::info!(path = %path.display(), "Loaded environment file");
    }

    let args = Args::parse();
    let mut cfg = ServiceConfig::load(args.config.as_deref()).context("loading configuration")?;
    if let Some(bind) = args.bind {
        cfg.server.bind = bind;
    }
    if let Some(db) = args.db {
        cfg.database.path = db.to_string_lossy().into_owned();
    }

    let store = SubmissionStore::open(Path::new(&cfg.database.path), &cfg.database)
        .context("opening submission store")?;
    let dispatcher = NotificationDispatcher::from_config(&cfg.notifications)
        .context("configuring notifications")?;
    let guard: Arc<dyn RateGuard> = Arc::new(SlidingWindowGuard::from_config(&cfg.rate_limit));

    if !cfg.admin.is_configured() {
        tracing::warn!("ADMIN_USERNAME / ADMIN_PASSWORD not set; all admin requests will be rejected");
    }

    let state = AppState::new(&cfg, store, Arc::clone(&guard), dispatcher);
    let sweeper = spawn_rate_guard_sweeper(
        guard,
        Duration::from_secs(cfg.rate_limit.sweep_interval_secs.max(1)),
    );

    let listener = TcpListener::bind(&cfg.server.bind)
        .await
        .with_context(|| format!("binding {}", cfg.server.bind))?;
    tracing::info!(
        addr = %listener.local_addr()?,
        trust_forwarded_for = cfg.server.trust_forwarded_for,
        "Listening"
    );

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("serving HTTP")?;

    sweeper.abort();
    tracing::info!("scoreazy-service exiting cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    tracing::info!("Signal received, shutting down");
}
