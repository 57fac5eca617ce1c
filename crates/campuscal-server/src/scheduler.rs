use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use campuscal_core::{CalendarSync, FetchWindow, PassReport};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::persist::write_atomic;

/// Runs a fetch pass at startup and then on every interval tick.
pub struct Scheduler {
    sync: CalendarSync,
    window: FetchWindow,
    interval: Duration,
    ical_file: PathBuf,
}

impl Scheduler {
    pub fn new(sync: CalendarSync, window: FetchWindow, interval: Duration, ical_file: PathBuf) -> Self {
        Self {
            sync,
            window,
            interval,
            ical_file,
        }
    }

    /// Loop forever. Failed passes are logged and retried on the next tick.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = self.interval.as_secs(),
            months = self.window.month_count(),
            "Scheduler started"
        );

        loop {
            ticker.tick().await;
            if let Err(e) = self.tick().await {
                error!(error = %format_args!("{:#}", e), "Fetch pass failed");
            }
        }
    }

    /// One pass over the current window, persisting the result if anything
    /// was fetched.
    pub async fn tick(&self) -> Result<PassReport> {
        let months = self.window.current();
        let report = self
            .sync
            .run_pass(&months)
            .await
            .context("Authentication failed")?;

        match &report.merged {
            Some(merged) => {
                write_atomic(&self.ical_file, merged.as_str().as_bytes()).await?;
                info!(
                    path = %self.ical_file.display(),
                    events = merged.event_count(),
                    "Merged calendar written"
                );
            }
            None => warn!("No months fetched, keeping previous calendar"),
        }

        Ok(report)
    }
}
