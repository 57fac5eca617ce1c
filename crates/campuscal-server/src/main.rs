//! campuscal - serves a campus portal calendar as a single iCalendar feed.
//!
//! Logs in to the portal on a schedule, exports every month of the fetch
//! window, merges the results and serves them at `/tucan.ics`.

mod persist;
mod scheduler;
mod server;

use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use campuscal_core::config::credentials_from_env;
use campuscal_core::{CalendarStore, CalendarSync, Config};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use scheduler::Scheduler;

// ============================================================================
// Constants
// ============================================================================

/// Log filter used when `RUST_LOG` is unset
const DEFAULT_LOG_FILTER: &str = "info";

/// File name prefix for daily log files
const LOG_FILE_PREFIX: &str = "campuscal.log";

/// Initialize the tracing subscriber for logging.
///
/// Logs always go to stderr. With a log directory, a daily-rolling file is
/// written as well; the returned guard must live until shutdown so buffered
/// lines are flushed.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
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

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::load().context("Failed to load configuration")?;
    let _log_guard = init_tracing(config.log_dir.as_deref());

    let credentials = credentials_from_env(|key| std::env::var(key).ok())?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        portal = %config.base_url,
        output = %config.ical_file.display(),
        "campuscal starting"
    );

    let store = CalendarStore::new();
    match persist::restore(&store, &config.ical_file).await {
        Ok(true) => info!(
            path = %config.ical_file.display(),
            "Serving previous calendar until the first pass completes"
        ),
        Ok(false) => {}
        Err(e) => warn!(error = %format_args!("{:#}", e), "Could not load previous calendar"),
    }

    let sync = CalendarSync::new(config.portal()?, credentials, store.clone())
        .with_max_concurrent(config.max_concurrent_exports);
    let scheduler = Scheduler::new(
        sync,
        config.window(),
        config.update_interval(),
        config.ical_file.clone(),
    );

    let scheduler_task = tokio::spawn(scheduler.run());
    let result = server::serve(config.socket_addr(), store, shutdown_signal()).await;
    // A pass cut off here leaves at most a stale temp file, which the next
    // write replaces.
    scheduler_task.abort();

    info!("campuscal stopped");
    result
}
