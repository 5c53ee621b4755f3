use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub crm: CrmConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// CRM connection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrmConfig {
    /// CRM API base URL (e.g., "https://api.hubapi.com")
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Private app access token. Usually supplied through
    /// `FIELDSYNC_CRM__ACCESS_TOKEN` rather than the config file.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Custom object type id of the subscription objects (e.g., "2-32975090")
    #[serde(default = "default_subscription_object_type")]
    pub subscription_object_type: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

impl CrmConfig {
    /// Access token, treating an empty string the same as a missing one.
    pub fn token(&self) -> Option<&str> {
        self.access_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            access_token: None,
            subscription_object_type: default_subscription_object_type(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.hubapi.com".to_string()
}

fn default_subscription_object_type() -> String {
    "2-32975090".to_string()
}

fn default_timeout() -> u32 {
    30
}

/// Reconciliation timing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Minutes between association polls while waiting for subscriptions
    #[serde(default = "default_poll_interval")]
    pub poll_interval_minutes: u64,
    /// Upper bound on how long to wait for subscriptions to appear
    #[serde(default = "default_max_wait")]
    pub max_wait_minutes: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_minutes: default_poll_interval(),
            max_wait_minutes: default_max_wait(),
        }
    }
}

fn default_poll_interval() -> u64 {
    10
}

fn default_max_wait() -> u64 {
    30
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub crm: SanitizedCrmConfig,
    pub sync: SyncConfig,
}

/// Sanitized CRM config (access token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedCrmConfig {
    pub base_url: String,
    pub access_token_configured: bool,
    pub subscription_object_type: String,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            crm: SanitizedCrmConfig {
                base_url: config.crm.base_url.clone(),
                access_token_configured: config.crm.token().is_some(),
                subscription_object_type: config.crm.subscription_object_type.clone(),
                timeout_secs: config.crm.timeout_secs,
            },
            sync: config.sync.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.crm.base_url, "https://api.hubapi.com");
        assert_eq!(config.crm.subscription_object_type, "2-32975090");
        assert_eq!(config.crm.timeout_secs, 30);
        assert!(config.crm.access_token.is_none());
        assert_eq!(config.sync.poll_interval_minutes, 10);
        assert_eq!(config.sync.max_wait_minutes, 30);
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 9000

[crm]
base_url = "http://localhost:4010"
access_token = "pat-test"
subscription_object_type = "2-1234"
timeout_secs = 5

[sync]
poll_interval_minutes = 5
max_wait_minutes = 60
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.crm.base_url, "http://localhost:4010");
        assert_eq!(config.crm.token(), Some("pat-test"));
        assert_eq!(config.crm.subscription_object_type, "2-1234");
        assert_eq!(config.crm.timeout_secs, 5);
        assert_eq!(config.sync.poll_interval_minutes, 5);
        assert_eq!(config.sync.max_wait_minutes, 60);
    }

    #[test]
    fn test_blank_token_counts_as_missing() {
        let crm = CrmConfig {
            access_token: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(crm.token().is_none());
    }

    #[test]
    fn test_sanitized_config_hides_token() {
        let config = Config {
            crm: CrmConfig {
                access_token: Some("pat-secret".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.crm.access_token_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("pat-secret"));
    }

    #[test]
    fn test_sanitized_config_without_token() {
        let sanitized = SanitizedConfig::from(&Config::default());
        assert!(!sanitized.crm.access_token_configured);
        assert_eq!(sanitized.server.port, 8080);
        assert_eq!(sanitized.sync.max_wait_minutes, 30);
    }
}
