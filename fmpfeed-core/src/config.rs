//! Client configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file is a valid configuration
//! (apart from the credential, which usually comes from `FMP_API_KEY`).

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::FetchError;

pub const DEFAULT_BASE_URL: &str = "https://financialmodelingprep.com/";
pub const API_KEY_ENV: &str = "FMP_API_KEY";

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Fail fast on the first invalid record; otherwise skip and report it.
    pub strict: bool,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub breaker_cooldown_secs: u64,
    pub breaker_failure_threshold: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            strict: true,
            timeout_secs: 30,
            user_agent: concat!("fmpfeed/", env!("CARGO_PKG_VERSION")).to_string(),
            breaker_cooldown_secs: 30 * 60,
            breaker_failure_threshold: 3,
        }
    }
}

impl ClientConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, FetchError> {
        toml::from_str(content).map_err(|e| FetchError::Config(format!("parse config TOML: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self, FetchError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FetchError::Config(format!("read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml(&self) -> Result<String, FetchError> {
        toml::to_string_pretty(self).map_err(|e| FetchError::Config(format!("serialize config: {e}")))
    }

    /// Let `FMP_API_KEY` replace the configured key.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        self
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("strict", &self.strict)
            .field("timeout_secs", &self.timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("breaker_cooldown_secs", &self.breaker_cooldown_secs)
            .field("breaker_failure_threshold", &self.breaker_failure_threshold)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_toml_is_all_defaults() {
        let config = ClientConfig::from_toml_str("").unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.strict);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.breaker_failure_threshold, 3);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn partial_toml_overrides_fields() {
        let config = ClientConfig::from_toml_str("strict = false\ntimeout_secs = 5\n").unwrap();
        assert!(!config.strict);
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.breaker_cooldown_secs, 1800);
    }

    #[test]
    fn bad_toml_is_config_error() {
        assert!(matches!(
            ClientConfig::from_toml_str("strict = \"maybe\""),
            Err(FetchError::Config(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api_key = \"from-file\"").unwrap();
        let config = ClientConfig::load(file.path()).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClientConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, FetchError::Config(_)));
    }

    #[test]
    fn env_key_wins_unless_blank() {
        let config = ClientConfig {
            api_key: Some("file".into()),
            ..ClientConfig::default()
        };
        let overridden = config
            .clone()
            .with_overrides(|_| Some("env".to_string()));
        assert_eq!(overridden.api_key.as_deref(), Some("env"));
        let kept = config.with_overrides(|_| Some(" ".to_string()));
        assert_eq!(kept.api_key.as_deref(), Some("file"));
    }

    #[test]
    fn debug_redacts_key() {
        let config = ClientConfig {
            api_key: Some("hunter2".into()),
            ..ClientConfig::default()
        };
        assert!(!format!("{config:?}").contains("hunter2"));
    }

    #[test]
    fn toml_roundtrip() {
        let config = ClientConfig::default();
        let back = ClientConfig::from_toml_str(&config.to_toml().unwrap()).unwrap();
        assert_eq!(back.user_agent, config.user_agent);
    }
}
