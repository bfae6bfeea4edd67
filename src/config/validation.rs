use crate::config::types::{
    BrowserSettings, CatalogConfig, Config, FetchConfig, OutputConfig, PacingConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_catalog_config(&config.catalog)?;
    validate_fetch_config(&config.fetch)?;
    validate_browser_settings(&config.browser)?;
    validate_pacing_config(&config.pacing)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the catalog entry point and enumeration bounds
fn validate_catalog_config(config: &CatalogConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid catalog url '{}': {}", config.url, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Catalog url '{}' must use http or https",
            config.url
        )));
    }

    if config.max_reveal_clicks < 1 {
        return Err(ConfigError::Validation(
            "max-reveal-clicks must be >= 1".to_string(),
        ));
    }

    if config.max_enumeration_attempts < 1 {
        return Err(ConfigError::Validation(
            "max-enumeration-attempts must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates fetch configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates browser launch parameters
fn validate_browser_settings(config: &BrowserSettings) -> Result<(), ConfigError> {
    if config.page_load_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "page-load-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.window_width == 0 || config.window_height == 0 {
        return Err(ConfigError::Validation(format!(
            "window size must be non-zero, got {}x{}",
            config.window_width, config.window_height
        )));
    }

    if let Some(executable) = &config.executable {
        if executable.trim().is_empty() {
            return Err(ConfigError::Validation(
                "executable cannot be an empty path".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates that every delay range is ordered
fn validate_pacing_config(config: &PacingConfig) -> Result<(), ConfigError> {
    let ranges = [
        ("reveal-delay-secs", config.reveal_delay_secs),
        ("request-delay-secs", config.request_delay_secs),
        ("skip-delay-secs", config.skip_delay_secs),
        ("connection-backoff-secs", config.connection_backoff_secs),
    ];

    for (name, (min, max)) in ranges {
        validate_range(name, min, max)?;
    }

    Ok(())
}

fn validate_range(name: &str, min: u64, max: u64) -> Result<(), ConfigError> {
    if min > max {
        return Err(ConfigError::Validation(format!(
            "{} must be [min, max] with min <= max, got [{}, {}]",
            name, min, max
        )));
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    validate_portal_suffix(&config.portal_suffix)?;

    if let Some(path) = &config.database_path {
        if path.is_empty() {
            return Err(ConfigError::Validation(
                "database-path cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

/// The suffix ends up in a file name, so only a safe character set is allowed
fn validate_portal_suffix(suffix: &str) -> Result<(), ConfigError> {
    if suffix.is_empty() {
        return Err(ConfigError::Validation(
            "portal-suffix cannot be empty".to_string(),
        ));
    }

    if !suffix
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "portal-suffix must contain only ASCII letters, digits, '_' and '-', got '{}'",
            suffix
        )));
    }

    Ok(())
}
