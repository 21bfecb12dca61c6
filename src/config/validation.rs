use crate::config::types::CrawlConfig;
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    validate_seed(config)?;
    validate_limits(config)?;
    validate_user_agent(config)?;
    Ok(())
}

/// Validates the seed URL
fn validate_seed(config: &CrawlConfig) -> Result<(), ConfigError> {
    let scheme = config.seed_url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(ConfigError::Validation(format!(
            "seed-url must use http or https, got '{}'",
            scheme
        )));
    }

    if config.seed_url.host_str().is_none() {
        return Err(ConfigError::Validation(
            "seed-url must have a host".to_string(),
        ));
    }

    Ok(())
}

/// Validates numeric limits
fn validate_limits(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 100, got {}",
            config.concurrency
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    Ok(())
}

/// Validates the user agent string
fn validate_user_agent(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    // Header values cannot carry control characters
    if config.user_agent.chars().any(|c| c.is_control()) {
        return Err(ConfigError::Validation(
            "user-agent cannot contain control characters".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn base_config() -> CrawlConfig {
        CrawlConfig::new(Url::parse("https://example.com/").unwrap())
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&base_config()).is_ok());
    }

    #[test]
    fn test_rejects_non_http_seed() {
        let mut config = base_config();
        config.seed_url = Url::parse("ftp://example.com/").unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let mut config = base_config();
        config.concurrency = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_excessive_concurrency() {
        let mut config = base_config();
        config.concurrency = 500;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let mut config = base_config();
        config.timeout_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_empty_user_agent() {
        let mut config = base_config();
        config.user_agent = "  ".to_string();
        assert!(validate_config(&config).is_err());
    }
}
