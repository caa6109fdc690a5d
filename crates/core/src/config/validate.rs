use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Marketplace URL is non-empty and http(s)
/// - Timeouts are non-zero
/// - Retry attempts are within a sane range
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.marketplace.url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "marketplace.url cannot be empty".to_string(),
        ));
    }
    if !config.marketplace.url.starts_with("http://")
        && !config.marketplace.url.starts_with("https://")
    {
        return Err(ConfigError::ValidationError(format!(
            "marketplace.url must be an http(s) URL, got '{}'",
            config.marketplace.url
        )));
    }

    if config.marketplace.search_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "marketplace.search_timeout_secs cannot be 0".to_string(),
        ));
    }
    if config.marketplace.download_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "marketplace.download_timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.marketplace.page_size == 0 {
        return Err(ConfigError::ValidationError(
            "marketplace.page_size cannot be 0".to_string(),
        ));
    }

    if config.retry.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "retry.max_attempts cannot be 0".to_string(),
        ));
    }
    if config.retry.max_attempts > 10 {
        return Err(ConfigError::ValidationError(format!(
            "retry.max_attempts is unreasonably high ({}), maximum is 10",
            config.retry.max_attempts
        )));
    }

    if config.download.buffer_size == 0 {
        return Err(ConfigError::ValidationError(
            "download.buffer_size cannot be 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_empty_url_fails() {
        let mut config = Config::default();
        config.marketplace.url = "".to_string();
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_non_http_url_fails() {
        let mut config = Config::default();
        config.marketplace.url = "ftp://marketplace.example".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_timeout_fails() {
        let mut config = Config::default();
        config.marketplace.download_timeout_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_attempts_fails() {
        let mut config = Config::default();
        config.retry.max_attempts = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_excessive_attempts_fails() {
        let mut config = Config::default();
        config.retry.max_attempts = 50;
        assert!(validate_config(&config).is_err());
    }
}
