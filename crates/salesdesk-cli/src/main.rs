//! salesdesk - command-line client for the sales/inventory API.
//!
//! Sessions persist between runs (see `store` in the config file), so
//! `salesdesk login` once and the other commands reuse it, refreshing the
//! access credential silently when the server rejects it.

mod app;
mod commands;

use std::io;
use std::path::Path;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, error};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use commands::Cli;
use salesdesk_core::config::APP_NAME;

/// Log to stderr and, when `log_dir` is given, to a daily file there.
/// The returned guard must be held until exit so buffered lines are flushed.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, format!("{}.log", APP_NAME));
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let log_dir = salesdesk_core::Config::default()
        .cache_dir()
        .ok()
        .filter(|dir| std::fs::create_dir_all(dir).is_ok());
    let guard = init_tracing(log_dir.as_deref());
    debug!(command = ?cli.cmd, "Starting");

    let mut app = App::new(cli.api_url.as_deref(), cli.ephemeral, cli.json)?;
    let result = commands::run(&mut app, cli.cmd).await;
    if let Err(ref e) = result {
        error!("{:#}", e);
    }

    drop(guard);
    if result.is_err() {
        std::process::exit(1);
    }
    Ok(())
}
