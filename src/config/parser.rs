use crate::config::types::CrawlConfig;
use crate::config::validation::validate_config;
use crate::ConfigResult;
use std::fs;
use std::path::Path;

/// Loads and validates a configuration from a TOML file
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(CrawlConfig)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - File read, parse, or validation failure
pub fn load_config(path: &Path) -> ConfigResult<CrawlConfig> {
    let content = fs::read_to_string(path)?;
    let config: CrawlConfig = toml::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}
