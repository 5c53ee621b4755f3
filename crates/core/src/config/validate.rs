use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - CRM base URL is an http(s) URL and the object type is set
/// - Poll interval and request timeout are non-zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    let base_url = config.crm.base_url.trim();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(ConfigError::ValidationError(format!(
            "crm.base_url must be an http(s) URL, got '{}'",
            config.crm.base_url
        )));
    }

    if config.crm.subscription_object_type.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "crm.subscription_object_type cannot be empty".to_string(),
        ));
    }

    if config.crm.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "crm.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.sync.poll_interval_minutes == 0 {
        return Err(ConfigError::ValidationError(
            "sync.poll_interval_minutes cannot be 0".to_string(),
        ));
    }

    Ok(())
}
