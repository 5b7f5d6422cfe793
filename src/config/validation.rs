use crate::config::types::{CaptureConfig, Config, CrawlerConfig, OutputConfig};
use crate::url::{normalize_url, Scope};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_capture_config(&config.capture)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates scope, seed and retry settings
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    let scope = Scope::new(&config.base_origin).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid base-origin '{}': {}", config.base_origin, e))
    })?;

    let seed = normalize_url(config.seed_url()).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid seed '{}': {}", config.seed_url(), e))
    })?;

    if !scope.contains(&seed) {
        return Err(ConfigError::Validation(format!(
            "seed '{}' is outside base-origin '{}'",
            seed,
            scope.prefix()
        )));
    }

    if config.max_retry < 1 || config.max_retry > 20 {
        return Err(ConfigError::Validation(format!(
            "max-retry must be between 1 and 20, got {}",
            config.max_retry
        )));
    }

    Ok(())
}

/// Validates timing and viewport settings
fn validate_capture_config(config: &CaptureConfig) -> Result<(), ConfigError> {
    if config.page_timeout < 1000 {
        return Err(ConfigError::Validation(format!(
            "page-timeout must be >= 1000ms, got {}ms",
            config.page_timeout
        )));
    }

    if config.scroll_step < 1 {
        return Err(ConfigError::Validation(
            "scroll-step must be at least 1 pixel".to_string(),
        ));
    }

    for (name, value) in [
        ("viewport-width", config.viewport_width),
        ("viewport-height", config.viewport_height),
    ] {
        if !(100..=10_000).contains(&value) {
            return Err(ConfigError::Validation(format!(
                "{} must be between 100 and 10000, got {}",
                name, value
            )));
        }
    }

    if let Some(agent) = &config.user_agent {
        if agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "user-agent cannot be blank".to_string(),
            ));
        }
    }

    for arg in &config.extra_args {
        if !arg.starts_with("--") || arg.len() < 3 || arg.chars().any(char::is_whitespace) {
            return Err(ConfigError::Validation(format!(
                "extra-args entries must be single --switches, got '{}'",
                arg
            )));
        }
        if arg.starts_with("--user-agent") {
            return Err(ConfigError::Validation(
                "set the user agent with user-agent, not extra-args".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.output_root.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output-root cannot be empty".to_string(),
        ));
    }

    if config.checkpoint_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "checkpoint-path cannot be empty".to_string(),
        ));
    }

    if config.checkpoint_path.is_dir() {
        return Err(ConfigError::Validation(format!(
            "checkpoint-path '{}' is a directory",
            config.checkpoint_path.display()
        )));
    }

    Ok(())
}
