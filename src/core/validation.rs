//! Validation utilities for configuration values
//!
//! Used both as clap `value_parser`s and when applying TOML values, so CLI
//! and config file reject the same inputs with the same messages.

/// A configuration value failed validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

impl From<String> for ValidationError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl crate::core::error_handling::ContextualError for ValidationError {
    fn is_user_actionable(&self) -> bool {
        true
    }

    fn user_message(&self) -> Option<&str> {
        Some(&self.message)
    }
}

/// Validate positive integer value
pub fn validate_positive_int(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("Value must be greater than 0".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("'{}' is not a valid positive integer", value)),
    }
}

/// Validate glob pattern syntax
pub fn validate_glob_pattern(pattern: &str) -> Result<String, String> {
    match glob::Pattern::new(pattern) {
        Ok(_) => Ok(pattern.to_string()),
        Err(e) => Err(format!("Invalid glob pattern '{}': {}", pattern, e)),
    }
}

/// Validate a log level accepted by flexi_logger
pub fn validate_log_level(level: &str) -> Result<String, String> {
    match level.to_ascii_lowercase().as_str() {
        l @ ("trace" | "debug" | "info" | "warn" | "error" | "off") => Ok(l.to_string()),
        _ => Err(format!(
            "Invalid log level '{}' (expected trace, debug, info, warn, error or off)",
            level
        )),
    }
}

/// Validate an output format name
pub fn validate_output_format(format: &str) -> Result<String, String> {
    match format.to_ascii_lowercase().as_str() {
        f @ ("text" | "json") => Ok(f.to_string()),
        _ => Err(format!(
            "Unknown output format '{}' (expected text or json)",
            format
        )),
    }
}
