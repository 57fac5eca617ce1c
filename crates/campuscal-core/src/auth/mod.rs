//! Authentication against the portal.
//!
//! This module provides:
//! - `Credentials`: the username/password pair, redacted in debug output
//! - `Session`: the session identifier plus the cookie store it lives in
//! - `SessionAuthenticator`: the login state machine that produces a `Session`
//!
//! Sessions are never persisted and never explicitly closed. A new pass simply
//! logs in again.

pub mod authenticator;
pub mod credentials;
pub mod session;

pub use authenticator::SessionAuthenticator;
pub use credentials::Credentials;
pub use session::Session;
