use crate::config::{TransportConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECONDS};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{ApiError, Result};
use crate::utils::validation::{validate_non_empty_string, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub auth: Option<AuthSection>,
    #[serde(default)]
    pub tenant: Option<TenantSection>,
    #[serde(default)]
    pub logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_true")]
    pub with_credentials: bool,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            with_credentials: true,
            headers: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthSection {
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenantSection {
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSection {
    pub level: Option<String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

fn default_true() -> bool {
    true
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            ApiError::configuration(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content)
            .map_err(|e| ApiError::configuration(format!("TOML parsing error: {}", e)))
    }

    /// 替換環境變數 (例如 ${DOCEX_TOKEN})，找不到的保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| ApiError::configuration(format!("Invalid substitution pattern: {}", e)))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig::from_provider(self)
    }

    pub fn log_level(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.level.as_deref())
    }
}

/// 尚未替換的 `${VAR}` 視為沒有設定
fn resolved(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !(v.starts_with("${") && v.ends_with('}')))
}

impl ConfigProvider for TomlConfig {
    fn base_url(&self) -> &str {
        &self.api.base_url
    }

    fn timeout_seconds(&self) -> u64 {
        self.api.timeout_seconds
    }

    fn with_credentials(&self) -> bool {
        self.api.with_credentials
    }

    fn default_headers(&self) -> Vec<(String, String)> {
        let mut headers = TransportConfig::default().default_headers;
        for (name, value) in &self.api.headers {
            headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
            headers.push((name.clone(), value.clone()));
        }
        headers
    }

    fn auth_token(&self) -> Option<&str> {
        resolved(self.auth.as_ref().and_then(|a| a.token.as_deref()))
    }

    fn tenant_id(&self) -> Option<&str> {
        resolved(self.tenant.as_ref().and_then(|t| t.id.as_deref()))
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.transport_config().validate()?;

        if let Some(tenant_id) = self.tenant.as_ref().and_then(|t| t.id.as_deref()) {
            validate_non_empty_string("tenant.id", tenant_id)?;
        }

        if let Some(level) = self.log_level() {
            if !LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
                return Err(ApiError::configuration(format!(
                    "Invalid value for 'logging.level': '{}'. Valid levels: {}",
                    level,
                    LOG_LEVELS.join(", ")
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ErrorKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[api]
base_url = "https://console.example.com"
timeout_seconds = 60
with_credentials = false

[api.headers]
"X-Client" = "docex-cli"

[auth]
token = "abc123"

[tenant]
id = "tenant-1"

[logging]
level = "debug"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.base_url(), "https://console.example.com");
        assert_eq!(config.timeout_seconds(), 60);
        assert!(!config.with_credentials());
        assert_eq!(config.auth_token(), Some("abc123"));
        assert_eq!(config.tenant_id(), Some("tenant-1"));
        assert_eq!(config.log_level(), Some("debug"));
        assert!(config
            .default_headers()
            .contains(&("X-Client".to_string(), "docex-cli".to_string())));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config.base_url(), "http://localhost:8000");
        assert_eq!(config.timeout_seconds(), 30);
        assert!(config.with_credentials());
        assert_eq!(config.auth_token(), None);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("DOCEX_TEST_BASE_URL", "https://test.api.com");

        let toml_content = r#"
[api]
base_url = "${DOCEX_TEST_BASE_URL}"

[auth]
token = "${DOCEX_TEST_TOKEN_NOT_SET}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.base_url(), "https://test.api.com");
        assert_eq!(config.auth_token(), None);

        std::env::remove_var("DOCEX_TEST_BASE_URL");
    }

    #[test]
    fn test_config_validation() {
        let config = TomlConfig::from_toml_str(
            r#"
[api]
base_url = "invalid-url"
"#,
        )
        .unwrap();
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::Configuration);

        let config = TomlConfig::from_toml_str(
            r#"
[logging]
level = "loud"
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_error_is_configuration() {
        let err = TomlConfig::from_toml_str("[api\nbase_url = 1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[api]\nbase_url = \"https://file.example.com\"\n")
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.base_url(), "https://file.example.com");

        let err = TomlConfig::from_file("/definitely/missing/docex.toml").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
