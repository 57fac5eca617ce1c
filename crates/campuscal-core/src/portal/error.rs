use thiserror::Error;

use crate::calendar::DecodeError;

/// Failures while logging in. Any of these ends the whole fetch pass.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error("No session cookie received (response URL: {0})")]
    NoSessionCookie(String),

    #[error("Unexpected redirect to {0}, portal may be down")]
    UnexpectedRedirect(String),

    #[error("No session ID found in response")]
    NoSessionId,

    #[error("Invalid portal URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl AuthError {
    /// True when the login request ran out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, AuthError::Network(e) if e.is_timeout())
    }
}

/// Failures while exporting a single month. These never affect other months.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Access denied - session may have expired")]
    AccessDenied,

    #[error("No events in the requested month")]
    NoEvents,

    #[error("No calendar download link in export response")]
    NoDownloadLink,

    #[error("Failed to decode calendar: {0}")]
    Decode(#[from] DecodeError),

    #[error("Unexpected HTTP status {0}")]
    Status(reqwest::StatusCode),

    #[error("Invalid download URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl FetchError {
    /// True for outcomes that are normal for a month, not faults.
    pub fn is_expected(&self) -> bool {
        matches!(self, FetchError::NoEvents)
    }

    /// True when the request ran out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Network(e) if e.is_timeout())
    }
}
