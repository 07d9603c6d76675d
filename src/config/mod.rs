#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::{CliConfig, Command};
pub use toml_config::TomlConfig;

use crate::domain::ports::ConfigProvider;
use crate::utils::error::{ApiError, Result};
use crate::utils::validation::{validate_range, validate_url, Validate};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
/// 預設 30 秒，足以容納檔案上傳
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const MAX_TIMEOUT_SECONDS: u64 = 600;

/// Settings a [`Transport`](crate::core::transport::Transport) is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
    pub with_credentials: bool,
    pub default_headers: Vec<(String, String)>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            with_credentials: true,
            default_headers: vec![("Content-Type".to_string(), "application/json".to_string())],
        }
    }
}

impl TransportConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn from_provider<C: ConfigProvider + ?Sized>(provider: &C) -> Self {
        Self {
            base_url: provider.base_url().to_string(),
            timeout_seconds: provider.timeout_seconds(),
            with_credentials: provider.with_credentials(),
            default_headers: provider.default_headers(),
        }
    }

    pub fn timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_credentials(mut self, enabled: bool) -> Self {
        self.with_credentials = enabled;
        self
    }

    /// Adds or replaces a default header (names compare case-insensitively).
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.default_headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.default_headers.push((name, value.into()));
        self
    }
}

impl ConfigProvider for TransportConfig {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }

    fn with_credentials(&self) -> bool {
        self.with_credentials
    }

    fn default_headers(&self) -> Vec<(String, String)> {
        self.default_headers.clone()
    }
}

impl Validate for TransportConfig {
    fn validate(&self) -> Result<()> {
        validate_url("api.base_url", &self.base_url)?;
        validate_range(
            "api.timeout_seconds",
            self.timeout_seconds,
            1,
            MAX_TIMEOUT_SECONDS,
        )?;

        if let Some((name, _)) = self
            .default_headers
            .iter()
            .find(|(name, _)| name.trim().is_empty())
        {
            return Err(ApiError::configuration(format!(
                "Invalid value for 'api.headers': header name '{}' is empty",
                name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ErrorKind;

    #[test]
    fn test_default_transport_config() {
        let config = TransportConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.timeout_seconds, 30);
        assert!(config.with_credentials);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_header_replaces_existing() {
        let config = TransportConfig::new("https://api.example.com")
            .header("content-type", "application/vnd.api+json")
            .header("X-Client", "docex");

        assert_eq!(
            config.default_headers,
            vec![
                (
                    "content-type".to_string(),
                    "application/vnd.api+json".to_string()
                ),
                ("X-Client".to_string(), "docex".to_string()),
            ]
        );
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let err = TransportConfig::new("ftp://files.example.com")
            .validate()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        assert!(TransportConfig::default().timeout_seconds(0).validate().is_err());
        assert!(TransportConfig::default()
            .timeout_seconds(601)
            .validate()
            .is_err());
        assert!(TransportConfig::default().header(" ", "x").validate().is_err());
    }
}
