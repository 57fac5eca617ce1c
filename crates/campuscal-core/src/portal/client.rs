//! HTTP plumbing shared by the authenticator and the exporter.
//!
//! The portal exposes a single entry script; every workflow step is a form
//! POST to it, distinguished only by the `PRGNAME` field.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::Client;
use url::Url;

// ============================================================================
// Constants
// ============================================================================

/// Public address of the portal.
pub const DEFAULT_BASE_URL: &str = "https://www.tucan.tu-darmstadt.de";

/// Path of the portal's entry script, relative to the base URL.
const ENTRY_SCRIPT_PATH: &str = "/scripts/mgrqispi.dll";

/// The portal rejects clients that do not look like a browser.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

/// HTTP request timeout in seconds.
/// Applies to every request individually, login included.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Value of the `APPNAME` field on every form.
pub(crate) const APP_NAME: &str = "CampusNet";

/// Where the portal is and how to talk to it.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    base_url: Url,
    entry_url: Url,
    user_agent: String,
    timeout: Duration,
}

impl PortalConfig {
    /// Create a configuration for the portal at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, url::ParseError> {
        let base_url = Url::parse(base_url)?;
        let entry_url = base_url.join(ENTRY_SCRIPT_PATH)?;
        Ok(Self {
            base_url,
            entry_url,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Absolute URL of the entry script.
    pub fn entry_url(&self) -> &Url {
        &self.entry_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolve a link from a portal page. Absolute links are returned as-is.
    pub fn resolve(&self, target: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(target)
    }

    /// Build a client that keeps its cookies in `jar`.
    pub(crate) fn build_client(&self, jar: Arc<Jar>) -> reqwest::Result<Client> {
        Client::builder()
            .cookie_provider(jar)
            .user_agent(self.user_agent.as_str())
            .timeout(self.timeout)
            .build()
    }
}

/// Extract the target of a `Refresh` header (`<delay>;URL=<target>`).
pub(crate) fn refresh_target(header: &str) -> Option<&str> {
    let (_delay, rest) = header.split_once(';')?;
    let rest = rest.trim();
    let target = match rest.get(..4) {
        Some(prefix) if prefix.eq_ignore_ascii_case("url=") => &rest[4..],
        _ => rest,
    };
    let target = target.trim().trim_matches(|c: char| c == '\'' || c == '"');
    (!target.is_empty()).then_some(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_url() {
        let portal = PortalConfig::new("https://portal.example.org").expect("valid url");
        assert_eq!(
            portal.entry_url().as_str(),
            "https://portal.example.org/scripts/mgrqispi.dll"
        );
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let portal = PortalConfig::new("https://portal.example.org").expect("valid url");

        let relative = portal
            .resolve("/scripts/filetransfer.exe?id=42&type=ics")
            .expect("resolves");
        assert_eq!(
            relative.as_str(),
            "https://portal.example.org/scripts/filetransfer.exe?id=42&type=ics"
        );

        let absolute = portal
            .resolve("https://files.example.org/export.ics")
            .expect("resolves");
        assert_eq!(absolute.as_str(), "https://files.example.org/export.ics");
    }

    #[test]
    fn test_builders() {
        let portal = PortalConfig::new(DEFAULT_BASE_URL)
            .expect("valid url")
            .with_timeout(Duration::from_secs(5))
            .with_user_agent("test-agent");
        assert_eq!(portal.timeout(), Duration::from_secs(5));
        assert_eq!(portal.user_agent, "test-agent");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(PortalConfig::new("not a url").is_err());
    }

    #[test]
    fn test_refresh_target() {
        assert_eq!(
            refresh_target("0; URL=/scripts/mgrqispi.dll?APPNAME=CampusNet"),
            Some("/scripts/mgrqispi.dll?APPNAME=CampusNet")
        );
        assert_eq!(refresh_target("5;url=https://x.org/a"), Some("https://x.org/a"));
        assert_eq!(refresh_target("0; '/start'"), Some("/start"));
        assert_eq!(refresh_target("0"), None);
        assert_eq!(refresh_target("0; URL="), None);
    }
}
