//! Configuration management for the relay.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default provider page URL (can be overridden at compile time via AUTH_RELAY_PROVIDER_URL).
pub const DEFAULT_PROVIDER_URL: &str = match option_env!("AUTH_RELAY_PROVIDER_URL") {
    Some(url) => url,
    None => "https://your-project-id.web.app",
};

/// Path of the hidden document hosting the provider flow.
pub const DEFAULT_OFFSCREEN_DOCUMENT_PATH: &str = "offscreen.html";

/// Default bound on waiting for the host's `getAuth` reply.
pub const DEFAULT_REPLY_TIMEOUT_SECS: u64 = 120;

/// Default bound on waiting for the provider page's payload inside the host.
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 120;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Relay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// URL of the provider's hosted login page.
    #[serde(default = "default_provider_url")]
    pub provider_url: String,
    /// Path the offscreen document is opened at; used to find a live host.
    #[serde(default = "default_offscreen_document_path")]
    pub offscreen_document_path: String,
    /// Seconds to wait for the host's reply. `null` waits forever.
    #[serde(default = "default_reply_timeout_secs")]
    pub reply_timeout_secs: Option<u64>,
    /// Seconds the host waits for the provider payload. `null` waits forever.
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: Option<u64>,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_provider_url() -> String {
    DEFAULT_PROVIDER_URL.to_string()
}

fn default_offscreen_document_path() -> String {
    DEFAULT_OFFSCREEN_DOCUMENT_PATH.to_string()
}

fn default_reply_timeout_secs() -> Option<u64> {
    Some(DEFAULT_REPLY_TIMEOUT_SECS)
}

fn default_provider_timeout_secs() -> Option<u64> {
    Some(DEFAULT_PROVIDER_TIMEOUT_SECS)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            provider_url: default_provider_url(),
            offscreen_document_path: default_offscreen_document_path(),
            reply_timeout_secs: default_reply_timeout_secs(),
            provider_timeout_secs: default_provider_timeout_secs(),
        }
    }
}

impl Config {
    /// Read `<base>/config.json`, or defaults when it does not exist, then
    /// apply environment overrides and validate.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let mut config = match std::fs::read_to_string(paths.config_file()) {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => return Err(e.into()),
        };
        config.load_from_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file without environment overrides.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
    }

    /// Write the config to `<base>/config.json` as pretty JSON.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let mut raw = serde_json::to_string_pretty(self)?;
        raw.push('\n');
        std::fs::write(paths.config_file(), raw)?;
        Ok(())
    }

    fn load_from_env(&mut self) {
        if let Some(level) = non_empty_env("AUTH_RELAY_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(url) = non_empty_env("AUTH_RELAY_PROVIDER_URL") {
            self.provider_url = url;
        }
    }

    /// Check values that would otherwise fail late, mid sign-in.
    pub fn validate(&self) -> CoreResult<()> {
        self.provider_origin()?;
        if self.offscreen_document_path.trim().is_empty() {
            return Err(CoreError::Config(
                "offscreen_document_path must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the provider URL as a parsed URL.
    pub fn provider_url(&self) -> CoreResult<Url> {
        Url::parse(&self.provider_url).map_err(CoreError::from)
    }

    /// Origin that `initAuth` messages are posted to, e.g. `https://app.web.app`.
    pub fn provider_origin(&self) -> CoreResult<String> {
        let url = self.provider_url()?;
        let origin = url.origin();
        if !origin.is_tuple() {
            return Err(CoreError::Config(format!(
                "provider_url has an opaque origin: {}",
                self.provider_url
            )));
        }
        Ok(origin.ascii_serialization())
    }

    /// Reply timeout as a duration.
    pub fn reply_timeout(&self) -> Option<Duration> {
        self.reply_timeout_secs.map(Duration::from_secs)
    }

    /// Provider timeout as a duration.
    pub fn provider_timeout(&self) -> Option<Duration> {
        self.provider_timeout_secs.map(Duration::from_secs)
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    let raw = std::env::var(name).ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
