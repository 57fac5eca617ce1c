//! The portal's HTTP workflow.
//!
//! - `client`: shared configuration and request plumbing
//! - `scan`: token scanners for the portal's HTML pages
//! - `exporter`: the per-month export and download
//! - `error`: login and export failures

pub mod client;
pub mod error;
pub mod exporter;
pub mod scan;

pub use client::{PortalConfig, DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECS};
pub use error::{AuthError, FetchError};
pub use exporter::MonthExporter;
