use serde::{Deserialize, Serialize};

use crate::models::DEFAULT_INDEX;

/// Connection settings for the access layer
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Engine base URLs; requests rotate through them
    #[serde(default = "default_addresses")]
    pub addresses: Vec<String>,
    #[serde(default = "default_index")]
    pub index: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Sent as `Authorization: ApiKey <key>`; takes precedence over basic auth
    #[serde(default)]
    pub api_key: Option<String>,
    /// Transport timeout per request, 0 disables it
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Adds `refresh=wait_for` to writes so they are searchable on return
    #[serde(default)]
    pub refresh_on_write: bool,
    #[serde(default)]
    pub insecure_skip_verify: bool,
}

fn default_addresses() -> Vec<String> {
    vec!["http://127.0.0.1:9200".to_string()]
}

fn default_index() -> String {
    DEFAULT_INDEX.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl ClientConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: ClientConfig = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Single-node config with every other setting defaulted
    pub fn for_address(address: impl Into<String>) -> Self {
        Self {
            addresses: vec![address.into()],
            ..Self::default()
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            addresses: default_addresses(),
            index: default_index(),
            username: None,
            password: None,
            api_key: None,
            request_timeout_secs: default_request_timeout_secs(),
            refresh_on_write: false,
            insecure_skip_verify: false,
        }
    }
}

/// Settings of the in-memory development engine
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_cluster_name")]
    pub cluster_name: String,
    /// HTTP worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_port() -> String {
    "9200".to_string()
}

fn default_log_dir() -> String {
    "./logs".to_string()
}

fn default_cluster_name() -> String {
    "infodex-dev".to_string()
}

fn default_workers() -> usize {
    2
}

impl EngineConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&contents)?;
        Ok(config)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            log_dir: default_log_dir(),
            cluster_name: default_cluster_name(),
            workers: default_workers(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_defaults_from_empty_object() {
        let config: ClientConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.addresses, vec!["http://127.0.0.1:9200"]);
        assert_eq!(config.index, "info");
        assert_eq!(config.request_timeout_secs, 30);
        assert!(config.api_key.is_none());
        assert!(!config.refresh_on_write);
    }

    #[test]
    fn test_client_config_overrides() {
        let config: ClientConfig = serde_json::from_str(
            r#"{"addresses": ["http://es1:9200", "http://es2:9200"], "username": "esName", "password": "pass"}"#,
        )
        .unwrap();
        assert_eq!(config.addresses.len(), 2);
        assert_eq!(config.username.as_deref(), Some("esName"));
        assert_eq!(config.index, "info");
    }

    #[test]
    fn test_engine_config_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"port": "9201"}"#).unwrap();
        assert_eq!(config.port, "9201");
        assert_eq!(config.log_dir, "./logs");
        assert_eq!(config.cluster_name, "infodex-dev");
        assert_eq!(config.workers, 2);
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(ClientConfig::load("/nonexistent/infodex.json").is_err());
    }
}
