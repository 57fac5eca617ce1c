use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use super::{CachedData, CalendarCache};
use crate::calendar::{MergedCalendar, MonthCalendar, MonthKey};
use crate::utils::format_age;

/// Result of applying one pass to the store.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    /// Months added by this pass.
    pub inserted: Vec<MonthKey>,
    /// Months cached after this pass.
    pub cached_months: usize,
    /// The recomputed artifact, `None` when the pass produced nothing.
    pub merged: Option<Arc<MergedCalendar>>,
}

/// Snapshot for health reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStatus {
    pub months_cached: usize,
    pub last_updated: Option<DateTime<Utc>>,
}

impl StoreStatus {
    /// Age of the served artifact, or `"never"` before the first pass.
    pub fn age_display(&self) -> String {
        self.last_updated
            .map(|at| format_age(Utc::now() - at))
            .unwrap_or_else(|| "never".to_string())
    }
}

#[derive(Debug, Default)]
struct StoreState {
    cache: CalendarCache,
    merged: Option<CachedData<Arc<MergedCalendar>>>,
}

/// Process-wide calendar state.
///
/// Constructed once at startup and cloned into the fetch pipeline and the
/// HTTP handlers; all clones share the same cache.
#[derive(Debug, Clone, Default)]
pub struct CalendarStore {
    state: Arc<RwLock<StoreState>>,
}

impl CalendarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one pass's calendars under a single write lock.
    ///
    /// An empty pass leaves both the cache and the served artifact unchanged.
    pub async fn apply(&self, calendars: Vec<MonthCalendar>) -> RefreshOutcome {
        if calendars.is_empty() {
            let state = self.state.read().await;
            return RefreshOutcome {
                inserted: Vec::new(),
                cached_months: state.cache.len(),
                merged: None,
            };
        }

        let mut state = self.state.write().await;
        let inserted = state.cache.refresh(calendars);
        let merged = Arc::new(state.cache.merged());
        state.merged = Some(CachedData::new(Arc::clone(&merged)));

        debug!(
            inserted = inserted.len(),
            cached = state.cache.len(),
            "Calendar store updated"
        );

        RefreshOutcome {
            inserted,
            cached_months: state.cache.len(),
            merged: Some(merged),
        }
    }

    /// Serve an artifact left by an earlier run until the first pass lands.
    ///
    /// Ignored once a pass has published; the month cache is not touched, so
    /// the next non-empty pass replaces the artifact entirely. Returns whether
    /// the artifact was installed.
    pub async fn seed(&self, merged: MergedCalendar, written_at: DateTime<Utc>) -> bool {
        let mut state = self.state.write().await;
        if state.merged.is_some() {
            return false;
        }
        state.merged = Some(CachedData {
            data: Arc::new(merged),
            cached_at: written_at,
        });
        true
    }

    /// The artifact currently served, if any pass has produced one.
    pub async fn merged(&self) -> Option<Arc<MergedCalendar>> {
        self.state
            .read()
            .await
            .merged
            .as_ref()
            .map(|cached| Arc::clone(&cached.data))
    }

    pub async fn status(&self) -> StoreStatus {
        let state = self.state.read().await;
        StoreStatus {
            months_cached: state.cache.len(),
            last_updated: state.merged.as_ref().map(|cached| cached.cached_at),
        }
    }

    pub async fn cached_months(&self) -> Vec<MonthKey> {
        self.state.read().await.cache.months()
    }
}
