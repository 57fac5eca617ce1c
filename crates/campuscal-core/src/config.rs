//! Service configuration.
//!
//! Settings come from an optional JSON file, by default
//! `~/.config/campuscal/config.json`, and are then overridden by environment
//! variables. Credentials are only ever read from the environment.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::Credentials;
use crate::calendar::month::{DEFAULT_MONTHS_AFTER, DEFAULT_MONTHS_BEFORE, MAX_WINDOW_MONTHS};
use crate::calendar::FetchWindow;
use crate::portal::{PortalConfig, DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::sync::DEFAULT_MAX_CONCURRENT_EXPORTS;

/// Application name used for the config directory
const APP_NAME: &str = "campuscal";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_ICAL_FILE: &str = "merged_calendar.ics";
const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 3600;
const DEFAULT_PORT: u16 = 8080;

// ============================================================================
// Environment variables
// ============================================================================

pub const CONFIG_PATH_VAR: &str = "CAMPUSCAL_CONFIG";
pub const USERNAME_VAR: &str = "TUCAN_USERNAME";
pub const PASSWORD_VAR: &str = "TUCAN_PASSWORD";

const BASE_URL_VAR: &str = "CAMPUSCAL_BASE_URL";
const ICAL_FILE_VAR: &str = "ICAL_FILE";
const UPDATE_INTERVAL_VAR: &str = "UPDATE_INTERVAL_SECS";
const PORT_VAR: &str = "PORT";
const BIND_ADDRESS_VAR: &str = "BIND_ADDRESS";
const REQUEST_TIMEOUT_VAR: &str = "REQUEST_TIMEOUT_SECS";
const MONTHS_BEFORE_VAR: &str = "MONTHS_BEFORE";
const MONTHS_AFTER_VAR: &str = "MONTHS_AFTER";
const MAX_CONCURRENT_VAR: &str = "MAX_CONCURRENT_EXPORTS";
const LOG_DIR_VAR: &str = "CAMPUSCAL_LOG_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    /// Where the merged calendar is written after each productive pass.
    pub ical_file: PathBuf,
    pub update_interval_secs: u64,
    pub port: u16,
    pub bind_address: IpAddr,
    pub request_timeout_secs: u64,
    pub months_before: u32,
    pub months_after: u32,
    pub max_concurrent_exports: usize,
    /// Directory for daily-rolling log files. Logs go to stderr only when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            ical_file: PathBuf::from(DEFAULT_ICAL_FILE),
            update_interval_secs: DEFAULT_UPDATE_INTERVAL_SECS,
            port: DEFAULT_PORT,
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            months_before: DEFAULT_MONTHS_BEFORE,
            months_after: DEFAULT_MONTHS_AFTER,
            max_concurrent_exports: DEFAULT_MAX_CONCURRENT_EXPORTS,
            log_dir: None,
        }
    }
}

impl Config {
    /// Load from the config file and the process environment.
    pub fn load() -> Result<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` in place of the process environment.
    pub fn load_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_PATH_VAR) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => match Self::default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        config.apply_env(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE))
    }

    fn apply_env<F>(&mut self, lookup: &F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_var(lookup, BASE_URL_VAR)? {
            self.base_url = v;
        }
        if let Some(v) = parse_var(lookup, ICAL_FILE_VAR)? {
            self.ical_file = v;
        }
        if let Some(v) = parse_var(lookup, UPDATE_INTERVAL_VAR)? {
            self.update_interval_secs = v;
        }
        if let Some(v) = parse_var(lookup, PORT_VAR)? {
            self.port = v;
        }
        if let Some(v) = parse_var(lookup, BIND_ADDRESS_VAR)? {
            self.bind_address = v;
        }
        if let Some(v) = parse_var(lookup, REQUEST_TIMEOUT_VAR)? {
            self.request_timeout_secs = v;
        }
        if let Some(v) = parse_var(lookup, MONTHS_BEFORE_VAR)? {
            self.months_before = v;
        }
        if let Some(v) = parse_var(lookup, MONTHS_AFTER_VAR)? {
            self.months_after = v;
        }
        if let Some(v) = parse_var(lookup, MAX_CONCURRENT_VAR)? {
            self.max_concurrent_exports = v;
        }
        if let Some(v) = parse_var(lookup, LOG_DIR_VAR)? {
            self.log_dir = Some(v);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.update_interval_secs == 0 {
            bail!("update_interval_secs must be greater than zero");
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be greater than zero");
        }
        if self.months_before > MAX_WINDOW_MONTHS {
            bail!("months_before must be at most {}", MAX_WINDOW_MONTHS);
        }
        if self.months_after > MAX_WINDOW_MONTHS {
            bail!("months_after must be at most {}", MAX_WINDOW_MONTHS);
        }
        if self.max_concurrent_exports == 0 {
            bail!("max_concurrent_exports must be at least 1");
        }
        if self.ical_file.as_os_str().is_empty() {
            bail!("ical_file must not be empty");
        }
        PortalConfig::new(&self.base_url)
            .with_context(|| format!("Invalid base_url: {}", self.base_url))?;
        Ok(())
    }

    pub fn portal(&self) -> Result<PortalConfig> {
        let portal = PortalConfig::new(&self.base_url)
            .with_context(|| format!("Invalid base_url: {}", self.base_url))?;
        Ok(portal.with_timeout(Duration::from_secs(self.request_timeout_secs)))
    }

    pub fn window(&self) -> FetchWindow {
        FetchWindow::new(self.months_before, self.months_after)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}

/// Read the portal credentials using `lookup`. Both must be present and
/// non-empty.
pub fn credentials_from_env<F>(lookup: F) -> Result<Credentials>
where
    F: Fn(&str) -> Option<String>,
{
    let username = lookup(USERNAME_VAR).filter(|v| !v.is_empty());
    let password = lookup(PASSWORD_VAR).filter(|v| !v.is_empty());
    match (username, password) {
        (Some(username), Some(password)) => Ok(Credentials::new(username, password)),
        (None, _) => bail!("{} must be set", USERNAME_VAR),
        (_, None) => bail!("{} must be set", PASSWORD_VAR),
    }
}

/// Parse an environment variable. Unset or blank means "not overridden";
/// anything else must parse.
fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    let value = raw.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .with_context(|| format!("Invalid value for {}: {:?}", name, value))
}
