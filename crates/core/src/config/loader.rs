use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Load configuration from file with environment variable overrides.
/// Nesting in env keys uses a double underscore so snake_case field
/// names stay addressable, e.g. `VSIXGET_MARKETPLACE__SEARCH_TIMEOUT_SECS`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("VSIXGET_").split("__"))
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
[marketplace]
page_size = 10
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.marketplace.page_size, 10);
    }

    #[test]
    fn test_load_config_from_str_invalid() {
        let result = load_config_from_str("marketplace = 12");
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[marketplace]
search_timeout_secs = 15

[retry]
max_attempts = 2
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.marketplace.search_timeout_secs, 15);
        assert_eq!(config.retry.max_attempts, 2);
    }

    #[test]
    fn test_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "vsixget.toml",
                r#"
[marketplace]
page_size = 10
search_timeout_secs = 15
"#,
            )?;
            jail.set_env("VSIXGET_MARKETPLACE__SEARCH_TIMEOUT_SECS", "7");
            jail.set_env("VSIXGET_RETRY__MAX_ATTEMPTS", "4");

            let config = load_config(Path::new("vsixget.toml")).unwrap();
            // Env wins over the file, including snake_case keys
            assert_eq!(config.marketplace.search_timeout_secs, 7);
            assert_eq!(config.retry.max_attempts, 4);
            // Untouched file values survive
            assert_eq!(config.marketplace.page_size, 10);
            Ok(())
        });
    }
}
