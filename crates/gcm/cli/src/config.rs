use std::path::{Path, PathBuf};

use gcm_core::{FailureRule, StatusPolicy};
use gcm_push::{DEFAULT_ENDPOINT, GatewayConfig, MAX_RECIPIENTS_PER_REQUEST};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Config file not found at {0}")]
    NotFound(PathBuf),
    #[error("No gateway API key configured (set gateway.api_key or GCM_API_KEY)")]
    MissingApiKey,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub gateway: GatewaySection,
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewaySection {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_max_recipients")]
    pub max_recipients_per_request: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default)]
    pub status_policy: StatusPolicy,
    #[serde(default)]
    pub failure_rule: FailureRule,
}

fn default_database_url() -> String {
    "gcm.db".to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_max_recipients() -> usize {
    MAX_RECIPIENTS_PER_REQUEST
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_endpoint(),
            max_recipients_per_request: default_max_recipients(),
        }
    }
}

impl GatewaySection {
    /// Connection settings for the HTTP gateway.
    pub fn to_gateway_config(&self) -> Result<GatewayConfig, ConfigError> {
        let api_key = self
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        Ok(GatewayConfig {
            api_key,
            endpoint: self.endpoint.clone(),
            max_recipients_per_request: self.max_recipients_per_request,
        })
    }
}

impl Config {
    /// Load from an explicit path, or from the default location when present.
    ///
    /// A missing default file yields the defaults. Environment overrides are
    /// applied either way.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::load_from(path)?,
            None => {
                let default_path = Self::config_path();
                if default_path.exists() {
                    Self::load_from(&default_path)?
                } else {
                    Self::default()
                }
            }
        };

        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/etc"))
            .join("gcm")
            .join("config.toml")
    }

    /// Apply `DATABASE_URL` and `GCM_API_KEY` from `lookup`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(key) = lookup("GCM_API_KEY") {
            self.gateway.api_key = Some(key);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.database.url, "gcm.db");
        assert_eq!(config.gateway.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.gateway.max_recipients_per_request, 1000);
        assert_eq!(config.dispatch.status_policy, StatusPolicy::LastChunkWins);
        assert_eq!(config.dispatch.failure_rule, FailureRule::KeyPresent);
    }

    #[test]
    fn test_full_config() {
        let config: Config = toml::from_str(
            r#"
            [database]
            url = "/var/lib/gcm/gcm.db"

            [gateway]
            api_key = "secret"
            endpoint = "http://localhost:9000/send"
            max_recipients_per_request = 500

            [dispatch]
            status_policy = "any_failure_wins"
            failure_rule = "non_zero"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.url, "/var/lib/gcm/gcm.db");
        assert_eq!(config.dispatch.status_policy, StatusPolicy::AnyFailureWins);
        assert_eq!(config.dispatch.failure_rule, FailureRule::NonZero);

        let gateway = config.gateway.to_gateway_config().unwrap();
        assert_eq!(gateway.api_key, "secret");
        assert_eq!(gateway.endpoint, "http://localhost:9000/send");
        assert_eq!(gateway.max_recipients_per_request, 500);
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::default().with_overrides(|key| match key {
            "DATABASE_URL" => Some("other.db".to_string()),
            "GCM_API_KEY" => Some("from-env".to_string()),
            _ => None,
        });

        assert_eq!(config.database.url, "other.db");
        assert_eq!(config.gateway.api_key.as_deref(), Some("from-env"));
    }

    #[test]
    fn test_missing_api_key() {
        let config = Config::default();
        assert!(matches!(
            config.gateway.to_gateway_config(),
            Err(ConfigError::MissingApiKey)
        ));
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let path = Path::new("/nonexistent/gcm/config.toml");
        assert!(matches!(
            Config::load_from(path),
            Err(ConfigError::NotFound(p)) if p == path
        ));
    }
}
