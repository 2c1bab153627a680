//! statord — the stator daemon.
//!
//! Registers with the local Consul agent, keeps the registration fresh, and
//! serves `/metrics`, `/monitor` and `/config`. On SIGINT or SIGTERM the
//! server drains, the roster deregisters, and the process exits.
//!
//! # Usage
//!
//! ```text
//! statord --config /etc/stator/statord.toml --port 8087
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use stator_core::{Context, random_id};
use stator_metrics::{DiskUsage, StatsService, Wave};
use stator_roster::{HttpClient, Roster};
use statord::{AppState, Config, build_router, drain};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const APP_ID: &str = "stator";
const DEFAULT_FILTER: &str = "info,statord=debug,stator=debug";

#[derive(Parser)]
#[command(
    name = "statord",
    about = "Registers with Consul and exposes stats for scraping"
)]
struct Cli {
    /// TOML config file; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Port to listen on, overriding the config file.
    #[arg(long)]
    port: Option<u16>,

    /// Emit logs as JSON.
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut cfg = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(port) = cli.port {
        cfg.server.port = port;
    }

    let run_id = random_id(7);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);
    let ctx = Context::background()
        .with_fields([("app_id", APP_ID.to_string()), ("run_id", run_id.clone())])
        .with_shutdown(shutdown_rx);
    info!(ctx = %ctx, config = %serde_json::to_string(&cfg)?, "starting up");

    // Bind before registering so the registered port is the real one.
    let listener =
        tokio::net::TcpListener::bind((cfg.server.address.as_str(), cfg.server.port)).await?;
    let addr = listener.local_addr()?;

    // ── Registration ───────────────────────────────────────────

    let client = HttpClient::new(cfg.consul.agent_address.clone(), cfg.consul.request_timeout);
    let registrar = Arc::new(cfg.consul.build(client));
    let roster = Roster::from_config(&cfg.roster, addr.port(), registrar);
    let roster_handle = roster.start(&ctx).await;

    // ── Stats ──────────────────────────────────────────────────

    let mut stats = StatsService::expose_process(APP_ID, run_id.clone());
    stats.add_collector(DiskUsage::new(cfg.collectors.disk_paths.clone()));
    if cfg.collectors.wave {
        stats.add_collector(Wave::new());
    }

    // ── API server ─────────────────────────────────────────────

    let router = build_router(AppState::new(stats, cfg, APP_ID, run_id));
    info!(ctx = %ctx, %addr, "server starting");

    let server_ctx = ctx.clone();
    let signal_tx = Arc::clone(&shutdown_tx);
    let served = axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!(ctx = %server_ctx, "shutdown signal received");
            signal_tx.send_replace(true);
        })
        .await;

    // Deregister even when serving failed.
    drain(&ctx, served, &shutdown_tx, roster_handle).await?;

    info!(ctx = %ctx, "stopped");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Resolves on SIGINT, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
