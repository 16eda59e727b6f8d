//! Validation utilities for CLI arguments
//!
//! Used as clap value parsers so that invalid queue parameters are rejected
//! before any queue is constructed.

/// Validate positive integer value
pub fn validate_positive_int(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("Value must be greater than 0".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("'{}' is not a valid positive integer", value)),
    }
}

/// Validate a duration given in whole milliseconds
pub fn validate_interval_ms(value: &str) -> Result<u64, String> {
    match value.parse::<u64>() {
        Ok(0) => Err("Interval must be at least 1 millisecond".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("'{}' is not a valid number of milliseconds", value)),
    }
}
