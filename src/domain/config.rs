//! Rate limiter configuration and configuration errors.

use std::time::Duration;

/// Error returned when a configuration value is rejected.
///
/// Configuration errors are fatal: they are raised before any work starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Rate limit must admit at least one request per window
    ZeroRate,
    /// Window duration must be greater than zero
    ZeroWindow,
    /// Fanout must dispatch at least one worker
    ZeroFanout,
    /// Report interval must be greater than zero
    ZeroReportInterval,
    /// The selected store backend needs a cluster address
    MissingCluster,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ZeroRate => {
                write!(f, "rate limit must be greater than 0")
            }
            ConfigError::ZeroWindow => {
                write!(f, "rate limit window must be greater than 0")
            }
            ConfigError::ZeroFanout => {
                write!(f, "parallelism must be greater than 0")
            }
            ConfigError::ZeroReportInterval => {
                write!(f, "report interval must be greater than 0")
            }
            ConfigError::MissingCluster => {
                write!(f, "cluster address must be specified")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Immutable rate limiter settings: at most `rate` admissions per `window`.
///
/// # Example
/// ```
/// use rate_bench::RateLimiterConfig;
/// use std::time::Duration;
///
/// let config = RateLimiterConfig::per_second(40).unwrap();
/// assert_eq!(config.rate(), 40);
/// assert_eq!(config.window(), Duration::from_secs(1));
///
/// assert!(RateLimiterConfig::per_second(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterConfig {
    rate: u32,
    window: Duration,
}

impl RateLimiterConfig {
    /// Create a configuration admitting `rate` requests per `window`.
    ///
    /// # Errors
    /// Returns `ConfigError::ZeroRate` if `rate` is zero and
    /// `ConfigError::ZeroWindow` if `window` is zero.
    pub fn new(rate: u32, window: Duration) -> Result<Self, ConfigError> {
        if rate == 0 {
            return Err(ConfigError::ZeroRate);
        }
        if window.is_zero() {
            return Err(ConfigError::ZeroWindow);
        }
        Ok(Self { rate, window })
    }

    /// Create a configuration admitting `rate` requests per second.
    pub fn per_second(rate: u32) -> Result<Self, ConfigError> {
        Self::new(rate, Duration::from_secs(1))
    }

    /// Maximum admissions per window.
    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// Length of one window.
    pub fn window(&self) -> Duration {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let config = RateLimiterConfig::new(10, Duration::from_millis(500)).unwrap();
        assert_eq!(config.rate(), 10);
        assert_eq!(config.window(), Duration::from_millis(500));
    }

    #[test]
    fn test_zero_rate_rejected() {
        assert_eq!(
            RateLimiterConfig::new(0, Duration::from_secs(1)),
            Err(ConfigError::ZeroRate)
        );
    }

    #[test]
    fn test_zero_window_rejected() {
        assert_eq!(
            RateLimiterConfig::new(5, Duration::ZERO),
            Err(ConfigError::ZeroWindow)
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ConfigError::ZeroFanout.to_string(),
            "parallelism must be greater than 0"
        );
        assert_eq!(
            ConfigError::ZeroRate.to_string(),
            "rate limit must be greater than 0"
        );
    }
}
