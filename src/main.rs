//! # Stockwatch — single-product stock tracker
//!
//! Polls the shop's product API until the product is in stock, sends a
//! Telegram alert, then exits. A liveness server runs alongside.
//!
//! Usage:
//!   stockwatch                          # Config from env / .env
//!   stockwatch --config tracker.toml    # Explicit config file
//!   stockwatch --interval 120 -v        # Override interval, debug logging

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use stockwatch_channels::TelegramNotifier;
use stockwatch_core::config::{LoggingConfig, TrackerConfig};
use stockwatch_core::traits::{Notifier, Sleeper, TokioSleeper};
use stockwatch_tracker::{RunExit, SessionManager, StockChecker, Tracker, crash_message, supervise};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(
    name = "stockwatch",
    version,
    about = "🛒 Stockwatch — single-product stock tracker with Telegram alerts"
)]
struct Cli {
    /// TOML config file (default: ~/.stockwatch/config.toml if present)
    #[arg(short, long)]
    config: Option<String>,

    /// .env file to load (default: ./.env if present)
    #[arg(long)]
    env_file: Option<String>,

    /// Override the check interval in seconds
    #[arg(long)]
    interval: Option<u64>,

    /// Override the liveness server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.as_deref().map(expand_path);
    let env_file = cli.env_file.as_deref().map(expand_path);
    let mut config = TrackerConfig::load(config_path.as_deref(), env_file.as_deref())?;
    if let Some(interval) = cli.interval {
        config.tracker.check_interval_secs = interval;
    }
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }
    config.validate()?;

    init_logging(&config.logging, cli.verbose)?;

    // Liveness server on its own task; a failure here does not stop tracking
    let gateway_config = config.gateway.clone();
    let service = format!("{} Stock Tracker", config.product.display_name);
    tokio::spawn(async move {
        if let Err(e) = stockwatch_gateway::start(&gateway_config, &service).await {
            tracing::error!("❌ Liveness server stopped: {e}");
        }
    });

    let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::new(config.telegram.clone()));
    let sleeper: Arc<dyn Sleeper> = Arc::new(TokioSleeper);

    let tracker = match build_tracker(&config, notifier.clone(), sleeper.clone()) {
        Ok(tracker) => tracker,
        Err(e) => {
            let message = crash_message(&format!("{e:#}"));
            tracing::error!("{message}");
            notifier.notify(&message).await;
            return Err(e);
        }
    };

    let handle = tokio::spawn(async move {
        let mut tracker = tracker;
        tracker.run().await
    });

    match supervise(handle, shutdown_signal(), notifier.as_ref()).await {
        RunExit::Finished(_) | RunExit::Stopped => Ok(()),
        RunExit::Crashed(reason) => Err(anyhow::anyhow!(crash_message(&reason))),
    }
}

fn build_tracker(
    config: &TrackerConfig,
    notifier: Arc<dyn Notifier>,
    sleeper: Arc<dyn Sleeper>,
) -> Result<Tracker> {
    let session = SessionManager::initialize(config.cookies.clone(), &config.product.site_url)
        .context("Failed to initialize session")?;
    let checker = StockChecker::new(session, &config.product, notifier.clone(), sleeper.clone())
        .context("Failed to prepare product request")?;
    Ok(Tracker::new(checker, notifier, sleeper, config))
}

fn init_logging(logging: &LoggingConfig, verbose: bool) -> Result<()> {
    let default = if verbose {
        "stockwatch=debug,tower_http=debug"
    } else {
        "stockwatch=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let file_layer = if logging.file.is_empty() {
        None
    } else {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&logging.file)
            .with_context(|| format!("Failed to open log file {}", logging.file))?;
        Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file)),
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(file_layer)
        .init();
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("⚠️ Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("⚠️ Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
