//! One complete fetch pass: log in, export every month of the window with
//! bounded concurrency, then fold the results into the [`CalendarStore`].

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::auth::{Credentials, SessionAuthenticator};
use crate::cache::CalendarStore;
use crate::calendar::{MergedCalendar, MonthKey};
use crate::portal::{AuthError, FetchError, MonthExporter, PortalConfig};

/// Month exports in flight at once during a pass.
pub const DEFAULT_MAX_CONCURRENT_EXPORTS: usize = 4;

/// What happened during one pass.
#[derive(Debug, Default)]
pub struct PassReport {
    pub requested: Vec<MonthKey>,
    /// Months exported successfully, oldest first.
    pub fetched: Vec<MonthKey>,
    /// Months the portal reported as having no events.
    pub empty: Vec<MonthKey>,
    pub failed: Vec<(MonthKey, FetchError)>,
    /// Events across all fetched months.
    pub events: usize,
    /// Months that were new to the cache.
    pub inserted: Vec<MonthKey>,
    pub cached_months: usize,
    /// The recomputed artifact; `None` when nothing was fetched.
    pub merged: Option<Arc<MergedCalendar>>,
}

impl PassReport {
    pub fn fetched_count(&self) -> usize {
        self.fetched.len()
    }
}

pub struct CalendarSync {
    authenticator: SessionAuthenticator,
    exporter: MonthExporter,
    store: CalendarStore,
    max_concurrent: usize,
}

impl CalendarSync {
    pub fn new(portal: PortalConfig, credentials: Credentials, store: CalendarStore) -> Self {
        Self {
            authenticator: SessionAuthenticator::new(portal.clone(), credentials),
            exporter: MonthExporter::new(portal),
            store,
            max_concurrent: DEFAULT_MAX_CONCURRENT_EXPORTS,
        }
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn store(&self) -> &CalendarStore {
        &self.store
    }

    /// Run one pass over `months`.
    ///
    /// A login failure aborts the pass before anything is fetched. Failures
    /// of single months are recorded in the report and never affect other
    /// months.
    pub async fn run_pass(&self, months: &[MonthKey]) -> Result<PassReport, AuthError> {
        let session = match self.authenticator.authenticate().await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, timeout = e.is_timeout(), "Login failed");
                return Err(e);
            }
        };
        let session = &session;

        debug!(
            months = months.len(),
            max_concurrent = self.max_concurrent,
            "Exporting months"
        );

        let results: Vec<_> = stream::iter(months.iter().copied())
            .map(|month| async move { (month, self.exporter.export_month(session, month).await) })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        let mut report = PassReport {
            requested: months.to_vec(),
            ..Default::default()
        };
        let mut calendars = Vec::new();

        for (month, result) in results {
            match result {
                Ok(calendar) => {
                    let events = calendar.event_count();
                    info!(month = %month, events, "Month fetched");
                    report.events += events;
                    report.fetched.push(month);
                    calendars.push(calendar);
                }
                Err(e) if e.is_expected() => {
                    debug!(month = %month, "No events in month");
                    report.empty.push(month);
                }
                Err(e) => {
                    warn!(
                        month = %month,
                        error = %e,
                        timeout = e.is_timeout(),
                        "Month fetch failed"
                    );
                    report.failed.push((month, e));
                }
            }
        }

        report.fetched.sort();
        report.empty.sort();
        report.failed.sort_by_key(|(month, _)| *month);

        let outcome = self.store.apply(calendars).await;
        report.inserted = outcome.inserted;
        report.cached_months = outcome.cached_months;
        report.merged = outcome.merged;

        info!(
            fetched = report.fetched_count(),
            requested = months.len(),
            empty = report.empty.len(),
            failed = report.failed.len(),
            new = report.inserted.len(),
            cached = report.cached_months,
            "Fetch pass complete"
        );

        Ok(report)
    }
}
