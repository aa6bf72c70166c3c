use std::time::Duration;

use crate::error::{AppError, Result};

pub const AMAZON_SEARCH_URL: &str = "https://www.amazon.com/s";
pub const EBAY_SEARCH_URL: &str = "https://www.ebay.com/sch/i.html";

/// Sent on every outbound request; a bare reqwest default UA gets blocked
/// almost immediately by both marketplaces.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

/// Per-request timeout (seconds).
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Retry backoff: BACKOFF_BASE_MS * 2^attempt, capped at BACKOFF_CAP_MS.
pub const BACKOFF_BASE_MS: u64 = 500;
pub const BACKOFF_CAP_MS: u64 = 8_000;

/// Number of future periods the price forecast covers.
pub const FORECAST_HORIZON: usize = 5;

/// Minimum valid price points before a forecast is produced. Two points fit
/// a line exactly (zero residual), so the floor is set one above that —
/// below this the analyzer returns None rather than a meaningless trend.
pub const MIN_FORECAST_POINTS: usize = 3;

/// The four inbound parameters that fully determine pipeline behavior,
/// plus the log filter. No other implicit configuration exists.
#[derive(Debug, Clone)]
pub struct Config {
    pub product_name: String,
    /// Pages to scrape per source (MAX_PAGES, must be >= 1)
    pub max_pages: u32,
    /// Retry attempts per page fetch (MAX_RETRIES)
    pub max_retries: u32,
    /// Minimum delay between consecutive requests (DELAY_BETWEEN_REQUESTS, seconds)
    pub delay_between_requests: Duration,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let product_name = std::env::var("PRODUCT_NAME")
            .unwrap_or_else(|_| "wireless headphones".to_string());

        let max_pages = std::env::var("MAX_PAGES")
            .unwrap_or_else(|_| "2".to_string())
            .parse::<u32>()
            .map_err(|_| AppError::Config("MAX_PAGES must be a positive integer".to_string()))?;

        let max_retries = std::env::var("MAX_RETRIES")
            .unwrap_or_else(|_| "3".to_string())
            .parse::<u32>()
            .map_err(|_| {
                AppError::Config("MAX_RETRIES must be a non-negative integer".to_string())
            })?;

        let delay_secs = std::env::var("DELAY_BETWEEN_REQUESTS")
            .unwrap_or_else(|_| "2".to_string())
            .parse::<f64>()
            .map_err(|_| {
                AppError::Config(
                    "DELAY_BETWEEN_REQUESTS must be a non-negative number of seconds".to_string(),
                )
            })?;

        if !delay_secs.is_finite() || delay_secs < 0.0 {
            return Err(AppError::Config(
                "DELAY_BETWEEN_REQUESTS must be a non-negative number of seconds".to_string(),
            ));
        }

        let cfg = Self {
            product_name,
            max_pages,
            max_retries,
            delay_between_requests: Duration::from_secs_f64(delay_secs),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Eager validation; fatal to the run, names the offending parameter.
    pub fn validate(&self) -> Result<()> {
        if self.product_name.trim().is_empty() {
            return Err(AppError::Config("PRODUCT_NAME must not be empty".to_string()));
        }
        if self.max_pages == 0 {
            return Err(AppError::Config("MAX_PAGES must be >= 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            product_name: "wireless headphones".to_string(),
            max_pages: 2,
            max_retries: 3,
            delay_between_requests: Duration::from_secs(2),
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn zero_pages_is_rejected() {
        let mut cfg = base_config();
        cfg.max_pages = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("MAX_PAGES"));
    }

    #[test]
    fn empty_product_name_is_rejected() {
        let mut cfg = base_config();
        cfg.product_name = "  ".to_string();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("PRODUCT_NAME"));
    }
}
