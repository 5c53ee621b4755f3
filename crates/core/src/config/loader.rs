use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Prefix for environment variable overrides. Nested keys use `__`,
/// e.g. `FIELDSYNC_CRM__ACCESS_TOKEN`.
pub const ENV_PREFIX: &str = "FIELDSYNC_";

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[server]
port = 9000

[sync]
max_wait_minutes = 20
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.sync.max_wait_minutes, 20);
        assert_eq!(config.sync.poll_interval_minutes, 10);
    }

    #[test]
    fn test_load_config_from_str_wrong_type() {
        let toml = r#"
[server]
port = "not-a-port"
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[server]
host = "127.0.0.1"
port = 3000

[crm]
subscription_object_type = "2-555"
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
        assert_eq!(config.crm.subscription_object_type, "2-555");
    }

    #[test]
    fn test_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
[crm]
subscription_object_type = "2-555"

[sync]
max_wait_minutes = 20
"#,
            )?;
            jail.set_env("FIELDSYNC_CRM__ACCESS_TOKEN", "pat-from-env");
            jail.set_env("FIELDSYNC_SYNC__MAX_WAIT_MINUTES", "45");

            let config = load_config(Path::new("config.toml")).map_err(|e| e.to_string())?;
            assert_eq!(config.crm.token(), Some("pat-from-env"));
            assert_eq!(config.crm.subscription_object_type, "2-555");
            assert_eq!(config.sync.max_wait_minutes, 45);
            Ok(())
        });
    }

    #[test]
    fn test_empty_env_token_is_not_configured() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("config.toml", "")?;
            jail.set_env("FIELDSYNC_CRM__ACCESS_TOKEN", "");

            let config = load_config(Path::new("config.toml")).map_err(|e| e.to_string())?;
            assert_eq!(config.crm.token(), None);
            Ok(())
        });
    }
}
