//! Core library for campuscal.
//!
//! campuscal logs into a campus management portal that has no API, asks it
//! for one calendar export per month, and stitches the downloaded files into a
//! single feed. This crate holds everything with real state or failure modes:
//!
//! - [`auth`]: credential submission and session extraction
//! - [`portal`]: HTTP plumbing, HTML scanners and the per-month export flow
//! - [`calendar`]: month keys, the fetch window, UTF-16 decoding and merging
//! - [`cache`]: the append-only month cache and the shared [`CalendarStore`]
//! - [`sync`]: one complete fetch pass over a window of months
//! - [`config`]: settings loaded from a JSON file and the environment

pub mod auth;
pub mod cache;
pub mod calendar;
pub mod config;
pub mod portal;
pub mod sync;
pub mod utils;

pub use auth::{Credentials, Session, SessionAuthenticator};
pub use cache::{CachedData, CalendarCache, CalendarStore, RefreshOutcome, StoreStatus};
pub use calendar::{merge_all, FetchWindow, MergedCalendar, MonthCalendar, MonthKey};
pub use config::Config;
pub use portal::{AuthError, FetchError, MonthExporter, PortalConfig};
pub use sync::{CalendarSync, PassReport};
