//! Validation helpers for driver arguments and configuration values

use std::time::Duration;

/// Validate a strictly positive integer (worker counts, limiter capacity)
pub fn validate_positive_int(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("Value must be greater than 0".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("'{}' is not a valid positive integer", value)),
    }
}

/// Validate a non-negative millisecond count and turn it into a `Duration`
pub fn validate_millis(value: &str) -> Result<Duration, String> {
    value
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| format!("'{}' is not a valid number of milliseconds", value))
}

/// Validate a URL used by HTTP poll requests
///
/// Only the scheme is checked; anything else is the remote's business.
pub fn validate_http_url(url: &str) -> Result<String, String> {
    let trimmed = url.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.to_string())
    } else {
        Err(format!("'{}' is not an http(s) URL", url))
    }
}
