//! Month cache and the shared store the fetch pipeline and HTTP handlers use.
//!
//! The cache is append-only: the first successful export of a month is kept
//! for the life of the process.

pub mod manager;
pub mod store;

pub use manager::{CachedData, CalendarCache};
pub use store::{CalendarStore, RefreshOutcome, StoreStatus};
