use crate::adapters::whatsapp::{WhatsAppSettings, DEFAULT_API_VERSION, DEFAULT_BASE_URL};
use crate::core::bulk::{DEFAULT_CONCURRENCY, DEFAULT_SAMPLE_SIZE};
use crate::utils::error::{RelayError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_range,
    validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

pub const MAX_CONCURRENCY: usize = 64;
pub const DEFAULT_STORE_PATH: &str = "./recipients.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub bulk: BulkConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Extra credential sets keyed by tenant id
    #[serde(default)]
    pub tenants: BTreeMap<String, TenantConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    pub phone_number_id: Option<String>,
    pub access_token: Option<String>,
    pub business_account_id: Option<String>,
    #[serde(default = "default_send_timeout")]
    pub send_timeout_seconds: u64,
    #[serde(default = "default_upload_timeout")]
    pub upload_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    pub phone_number_id: String,
    pub access_token: String,
    pub business_account_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_send_timeout() -> u64 {
    30
}

fn default_upload_timeout() -> u64 {
    60
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_sample_size() -> usize {
    DEFAULT_SAMPLE_SIZE
}

fn default_store_path() -> String {
    DEFAULT_STORE_PATH.to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_version: default_api_version(),
            phone_number_id: None,
            access_token: None,
            business_account_id: None,
            send_timeout_seconds: default_send_timeout(),
            upload_timeout_seconds: default_upload_timeout(),
        }
    }
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            sample_size: default_sample_size(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// Empty strings count as unset.
fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl RelayConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(RelayError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        let mut config: RelayConfig = toml::from_str(&processed_content)
            .map_err(|e| RelayError::config(format!("TOML parsing error: {}", e)))?;
        config.normalize();
        Ok(config)
    }

    /// 沒有設定檔時，從環境變數建立配置
    pub fn from_env() -> Result<Self> {
        let mut config = RelayConfig::default();

        if let Ok(base_url) = std::env::var("WA_API_BASE") {
            config.provider.base_url = base_url;
        }
        if let Ok(version) = std::env::var("WA_API_VERSION") {
            config.provider.api_version = version;
        }
        config.provider.phone_number_id = std::env::var("WA_PHONE_ID").ok();
        config.provider.access_token = std::env::var("WA_TOKEN").ok();
        config.provider.business_account_id = std::env::var("WA_BUSINESS_ACCOUNT_ID").ok();

        if let Ok(path) = std::env::var("RELAY_STORE_PATH") {
            config.store.path = path;
        }
        if let Ok(concurrency) = std::env::var("RELAY_CONCURRENCY") {
            config.bulk.concurrency = concurrency.trim().parse().map_err(|_| {
                RelayError::validation(
                    "RELAY_CONCURRENCY",
                    format!("expected a number, got '{}'", concurrency),
                )
            })?;
        }

        config.normalize();
        Ok(config)
    }

    /// 替換環境變數 (例如 ${WA_TOKEN})，未設定的變數替換為空字串
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        use std::sync::OnceLock;

        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let re = PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static env pattern"));

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| {
                tracing::warn!("Environment variable {} is not set", var_name);
                String::new()
            })
        })
        .to_string()
    }

    fn normalize(&mut self) {
        self.provider.phone_number_id = non_empty(self.provider.phone_number_id.take());
        self.provider.access_token = non_empty(self.provider.access_token.take());
        self.provider.business_account_id = non_empty(self.provider.business_account_id.take());
    }

    pub fn has_default_credentials(&self) -> bool {
        self.provider.phone_number_id.is_some() && self.provider.access_token.is_some()
    }

    pub fn whatsapp_settings(&self) -> WhatsAppSettings {
        WhatsAppSettings {
            base_url: self.provider.base_url.clone(),
            api_version: self.provider.api_version.clone(),
            send_timeout: Duration::from_secs(self.provider.send_timeout_seconds),
            upload_timeout: Duration::from_secs(self.provider.upload_timeout_seconds),
        }
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_url("provider.base_url", &self.provider.base_url)?;
        validate_positive_number(
            "provider.send_timeout_seconds",
            self.provider.send_timeout_seconds,
            1,
        )?;
        validate_positive_number(
            "provider.upload_timeout_seconds",
            self.provider.upload_timeout_seconds,
            1,
        )?;
        validate_range("bulk.concurrency", self.bulk.concurrency, 1, MAX_CONCURRENCY)?;
        validate_path("store.path", &self.store.path)?;

        for (tenant, creds) in &self.tenants {
            validate_non_empty_string(
                &format!("tenants.{}.phone_number_id", tenant),
                &creds.phone_number_id,
            )?;
            validate_non_empty_string(
                &format!("tenants.{}.access_token", tenant),
                &creds.access_token,
            )?;
        }

        Ok(())
    }
}

impl Validate for RelayConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[provider]
base_url = "https://graph.facebook.com"
api_version = "v21.0"
phone_number_id = "1234"
access_token = "token"
send_timeout_seconds = 10

[bulk]
concurrency = 16

[store]
path = "/var/lib/relay/store.json"

[logging]
format = "json"

[tenants.acme]
phone_number_id = "acme-phone"
access_token = "acme-token"
"#;

        let config = RelayConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.provider.api_version, "v21.0");
        assert_eq!(config.provider.send_timeout_seconds, 10);
        assert_eq!(config.provider.upload_timeout_seconds, 60);
        assert_eq!(config.bulk.concurrency, 16);
        assert_eq!(config.bulk.sample_size, DEFAULT_SAMPLE_SIZE);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.tenants["acme"].phone_number_id, "acme-phone");
        assert!(config.has_default_credentials());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = RelayConfig::from_toml_str("").unwrap();
        assert_eq!(config.provider.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.bulk.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(config.store.path, DEFAULT_STORE_PATH);
        assert!(!config.has_default_credentials());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("RELAY_TEST_PHONE_ID", "55501");

        let toml_content = r#"
[provider]
phone_number_id = "${RELAY_TEST_PHONE_ID}"
access_token = "${RELAY_TEST_TOKEN_THAT_IS_NOT_SET}"
"#;

        let config = RelayConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.provider.phone_number_id.as_deref(), Some("55501"));
        assert!(config.provider.access_token.is_none());

        std::env::remove_var("RELAY_TEST_PHONE_ID");
    }

    #[test]
    fn test_config_validation() {
        let config = RelayConfig::from_toml_str(
            r#"
[provider]
base_url = "invalid-url"
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config = RelayConfig::from_toml_str(
            r#"
[bulk]
concurrency = 500
"#,
        )
        .unwrap();
        match config.validate() {
            Err(RelayError::ValidationError { field, .. }) => assert_eq!(field, "bulk.concurrency"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = RelayConfig::from_toml_str("[bulk\nconcurrency = ").unwrap_err();
        assert!(matches!(err, RelayError::ConfigError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[store]\npath = \"./data/recipients.json\"\n")
            .unwrap();

        let config = RelayConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.store.path, "./data/recipients.json");
    }
}
