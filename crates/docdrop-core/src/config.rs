//! Configuration types for docdrop.
//!
//! [`DocdropConfig`] is the user-level configuration stored in
//! `~/.docdrop/config.yaml`. Every section is optional; a missing file yields
//! the defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_LOCALE, DEFAULT_MAX_VISIBLE, DEFAULT_MAX_WAIT_SECS, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_SERVER_URL, DEFAULT_TIMEOUT_SECS, DOCDROP_HOME_DIR, GLOBAL_CONFIG_FILENAME,
};
use crate::errors::DropError;
use crate::messages::{MessageOverrides, SummaryMessages};

// ============================================================================
// DocdropConfig
// ============================================================================

/// Global (user-level) configuration.
///
/// # Example YAML
///
/// ```yaml
/// server:
///   url: https://docs.example.com
///   token: 0123456789abcdef
///   timeoutSecs: 60
/// dashboard:
///   maxVisible: 5
///   locale: de
///   messages:
///     added: "{count} new"
/// staging:
///   mergeStagedFiles: true
/// poll:
///   intervalMs: 1000
///   maxWaitSecs: 300
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocdropConfig {
    /// Document server connection.
    #[serde(default)]
    pub server: ServerConfig,

    /// Dashboard display settings.
    #[serde(default)]
    pub dashboard: DashboardConfig,

    /// Staging defaults.
    #[serde(default)]
    pub staging: StagingConfig,

    /// Task polling.
    #[serde(default)]
    pub poll: PollConfig,
}

impl DocdropConfig {
    /// Load the configuration from the default location (`~/.docdrop/config.yaml`).
    ///
    /// # Errors
    ///
    /// Returns [`DropError::InvalidConfig`] if the file exists but cannot be parsed.
    pub fn load_default() -> Result<Self, DropError> {
        match Self::default_path() {
            Some(path) => Self::from_path(&path),
            None => {
                tracing::debug!("Could not determine home directory, using default config");
                Ok(Self::default())
            }
        }
    }

    /// Load the configuration from a specific path.
    ///
    /// If the file does not exist, returns the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`DropError::InvalidConfig`] if the file cannot be read or parsed.
    /// Returns [`DropError::InvalidConfiguration`] if validation fails.
    pub fn from_path(path: &Path) -> Result<Self, DropError> {
        if !path.exists() {
            tracing::debug!("Config not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            DropError::InvalidConfig(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(&content).map_err(|e| {
                DropError::InvalidConfig(format!("Failed to parse {}: {}", path.display(), e))
            })?
        };

        for warning in config.validate()? {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok(config)
    }

    /// Default config directory (`~/.docdrop`).
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(DOCDROP_HOME_DIR))
    }

    /// Default config file path (`~/.docdrop/config.yaml`).
    pub fn default_path() -> Option<PathBuf> {
        Self::default_dir().map(|d| d.join(GLOBAL_CONFIG_FILENAME))
    }

    /// Summary messages for the configured locale, with overrides applied.
    pub fn summary_messages(&self) -> SummaryMessages {
        SummaryMessages::for_locale(&self.dashboard.locale).with_overrides(&self.dashboard.messages)
    }

    /// Copy of this configuration with the API token masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.server.token.is_some() {
            copy.server.token = Some("********".to_string());
        }
        copy
    }

    /// Render as YAML (in the on-disk format).
    pub fn to_yaml(&self) -> Result<String, DropError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Validate the configuration.
    ///
    /// Returns a list of warnings for questionable values.
    ///
    /// # Errors
    ///
    /// Returns [`DropError::InvalidConfiguration`] for values that would break
    /// the dashboard or the transport.
    pub fn validate(&self) -> Result<Vec<String>, DropError> {
        let mut warnings = Vec::new();
        warnings.extend(self.server.validate()?);
        warnings.extend(self.dashboard.validate()?);
        warnings.extend(self.poll.validate()?);
        Ok(warnings)
    }
}

// ============================================================================
// ServerConfig
// ============================================================================

/// Document server connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Base URL of the server.
    #[serde(default = "default_server_url")]
    pub url: String,

    /// API token sent as `Authorization: Token <token>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ServerConfig {
    fn validate(&self) -> Result<Vec<String>, DropError> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(DropError::InvalidConfiguration {
                message: format!("server.url '{}' is not an http(s) URL", self.url),
                hint: format!("Use a URL such as {}", DEFAULT_SERVER_URL),
            });
        }

        if self.timeout_secs == 0 {
            return Err(DropError::InvalidConfiguration {
                message: "server.timeoutSecs cannot be 0".to_string(),
                hint: format!("Set timeoutSecs to at least 1 (default: {})", DEFAULT_TIMEOUT_SECS),
            });
        }

        Ok(Vec::new())
    }

    /// Whether a non-empty API token is configured.
    pub fn has_token(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

// ============================================================================
// DashboardConfig
// ============================================================================

/// Dashboard display settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardConfig {
    /// Size of the primary status list.
    #[serde(default = "default_max_visible")]
    pub max_visible: usize,

    /// Locale of the summary line.
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Summary template overrides.
    #[serde(default, skip_serializing_if = "MessageOverrides::is_empty")]
    pub messages: MessageOverrides,
}

fn default_max_visible() -> usize {
    DEFAULT_MAX_VISIBLE
}

fn default_locale() -> String {
    DEFAULT_LOCALE.to_string()
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            max_visible: default_max_visible(),
            locale: default_locale(),
            messages: MessageOverrides::default(),
        }
    }
}

impl DashboardConfig {
    fn validate(&self) -> Result<Vec<String>, DropError> {
        let mut warnings = Vec::new();

        if self.max_visible == 0 {
            return Err(DropError::InvalidConfiguration {
                message: "dashboard.maxVisible must be at least 1".to_string(),
                hint: format!("Set dashboard.maxVisible to {}", DEFAULT_MAX_VISIBLE),
            });
        }

        if self.max_visible > 50 {
            warnings.push(format!(
                "dashboard.maxVisible={} is very large; the status list may not fit the terminal",
                self.max_visible
            ));
        }

        let messages = SummaryMessages::for_locale(&self.locale).with_overrides(&self.messages);
        for name in messages.templates_missing_placeholder() {
            warnings.push(format!(
                "dashboard.messages.{} has no {{count}} placeholder",
                name
            ));
        }

        Ok(warnings)
    }
}

// ============================================================================
// StagingConfig / PollConfig
// ============================================================================

/// Staging defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagingConfig {
    /// Stage drops (and merge on commit) instead of uploading right away.
    #[serde(default)]
    pub merge_staged_files: bool,
}

/// Task polling settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollConfig {
    /// Delay between polls.
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,

    /// Give up watching after this long.
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_max_wait_secs() -> u64 {
    DEFAULT_MAX_WAIT_SECS
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
            max_wait_secs: default_max_wait_secs(),
        }
    }
}

impl PollConfig {
    fn validate(&self) -> Result<Vec<String>, DropError> {
        let mut warnings = Vec::new();

        if self.interval_ms == 0 {
            return Err(DropError::InvalidConfiguration {
                message: "poll.intervalMs cannot be 0".to_string(),
                hint: format!(
                    "Set intervalMs to at least 100 (default: {})",
                    DEFAULT_POLL_INTERVAL_MS
                ),
            });
        }

        if self.interval_ms < 100 {
            warnings.push(format!(
                "poll.intervalMs={} is very short; the server may throttle requests",
                self.interval_ms
            ));
        }

        Ok(warnings)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let config = DocdropConfig::from_path(&temp.path().join("config.yaml")).unwrap();
        assert_eq!(config, DocdropConfig::default());
        assert_eq!(config.dashboard.max_visible, 5);
        assert_eq!(config.server.url, DEFAULT_SERVER_URL);
        assert!(!config.staging.merge_staged_files);
    }

    #[test]
    fn test_parse_partial_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        fs::write(
            &path,
            "server:\n  url: https://docs.example.com\n  token: abc\nstaging:\n  mergeStagedFiles: true\n",
        )
        .unwrap();

        let config = DocdropConfig::from_path(&path).unwrap();
        assert_eq!(config.server.url, "https://docs.example.com");
        assert_eq!(config.server.token.as_deref(), Some("abc"));
        assert_eq!(config.server.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(config.staging.merge_staged_files);
        assert_eq!(config.poll, PollConfig::default());
    }

    #[test]
    fn test_empty_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        fs::write(&path, "\n").unwrap();
        assert_eq!(
            DocdropConfig::from_path(&path).unwrap(),
            DocdropConfig::default()
        );
    }

    #[test]
    fn test_rejects_zero_max_visible() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        fs::write(&path, "dashboard:\n  maxVisible: 0\n").unwrap();
        let err = DocdropConfig::from_path(&path).unwrap_err();
        assert!(matches!(err, DropError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_invalid_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        fs::write(&path, "dashboard: [unclosed").unwrap();
        let err = DocdropConfig::from_path(&path).unwrap_err();
        assert!(matches!(err, DropError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_non_http_url() {
        let mut config = DocdropConfig::default();
        config.server.url = "ftp://docs".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_warnings() {
        let mut config = DocdropConfig::default();
        config.poll.interval_ms = 50;
        config.dashboard.messages.added = Some("added".to_string());
        let warnings = config.validate().unwrap();
        // A missing token only matters once something is uploaded.
        assert!(!warnings.iter().any(|w| w.contains("server.token")));
        assert!(warnings.iter().any(|w| w.contains("intervalMs")));
        assert!(warnings.iter().any(|w| w.contains("messages.added")));
    }

    #[test]
    fn test_has_token() {
        let mut server = ServerConfig::default();
        assert!(!server.has_token());
        server.token = Some(String::new());
        assert!(!server.has_token());
        server.token = Some("abc".to_string());
        assert!(server.has_token());
    }

    #[test]
    fn test_summary_messages_use_locale() {
        let mut config = DocdropConfig::default();
        config.dashboard.locale = "de".to_string();
        assert_eq!(config.summary_messages().render(0, 2, 0), "Fehlgeschlagen: 2");
    }

    #[test]
    fn test_redacted_masks_token() {
        let mut config = DocdropConfig::default();
        config.server.token = Some("secret".to_string());
        let yaml = serde_yaml::to_string(&config.redacted()).unwrap();
        assert!(!yaml.contains("secret"));
        assert!(yaml.contains("********"));
    }
}
