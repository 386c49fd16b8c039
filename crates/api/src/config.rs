//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use domain::{Money, PricingConfig, TransitionPolicy};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `FLAT_SHIPPING_FEE`: delivery fee below the threshold (default: `10000`)
/// - `FREE_SHIPPING_THRESHOLD`: subtotal that ships free (default: `50000`)
/// - `TRANSITION_MAX_ATTEMPTS`: conflict retries per transition (default: `3`)
/// - `TRANSITION_RETRY_DEADLINE_MS`: retry window (default: `2000`)
/// - `STORE_TIMEOUT_MS`: bound on each store call (default: `1000`)
/// - `CATALOG_PATH`: optional JSON file with vouchers and flash sales
///
/// Unparseable values fall back to the default.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub pricing: PricingConfig,
    pub transition: TransitionPolicy,
    pub catalog_path: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
            lookup(key).and_then(|v| v.trim().parse().ok())
        }

        let defaults = Self::default();
        let pricing = PricingConfig {
            flat_shipping_fee: parsed::<i64>(&lookup, "FLAT_SHIPPING_FEE")
                .filter(|fee| *fee >= 0)
                .map(Money::new)
                .unwrap_or(defaults.pricing.flat_shipping_fee),
            free_shipping_threshold: parsed::<i64>(&lookup, "FREE_SHIPPING_THRESHOLD")
                .filter(|threshold| *threshold >= 0)
                .map(Money::new)
                .unwrap_or(defaults.pricing.free_shipping_threshold),
        };
        let transition = TransitionPolicy {
            max_attempts: parsed::<u32>(&lookup, "TRANSITION_MAX_ATTEMPTS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.transition.max_attempts),
            retry_deadline: parsed::<u64>(&lookup, "TRANSITION_RETRY_DEADLINE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.transition.retry_deadline),
            store_timeout: parsed::<u64>(&lookup, "STORE_TIMEOUT_MS")
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.transition.store_timeout),
        };

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parsed(&lookup, "PORT").unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: parsed(&lookup, "LOG_FORMAT").unwrap_or_default(),
            pricing,
            transition,
            catalog_path: lookup("CATALOG_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            pricing: PricingConfig::default(),
            transition: TransitionPolicy::default(),
            catalog_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.pricing.flat_shipping_fee, Money::new(10_000));
        assert_eq!(config.pricing.free_shipping_threshold, Money::new(50_000));
        assert_eq!(config.transition.max_attempts, 3);
        assert!(config.catalog_path.is_none());
    }

    #[test]
    fn test_empty_environment_gives_defaults() {
        let config = from_pairs(&[]);
        assert_eq!(config.addr(), "0.0.0.0:3000");
        assert_eq!(config.transition, TransitionPolicy::default());
    }

    #[test]
    fn test_reads_every_key() {
        let config = from_pairs(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("RUST_LOG", "debug"),
            ("LOG_FORMAT", "JSON"),
            ("FLAT_SHIPPING_FEE", "15000"),
            ("FREE_SHIPPING_THRESHOLD", "0"),
            ("TRANSITION_MAX_ATTEMPTS", "5"),
            ("TRANSITION_RETRY_DEADLINE_MS", "500"),
            ("STORE_TIMEOUT_MS", "250"),
            ("CATALOG_PATH", "/etc/storefront/catalog.json"),
        ]);

        assert_eq!(config.addr(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.pricing.flat_shipping_fee, Money::new(15_000));
        assert_eq!(config.pricing.free_shipping_threshold, Money::zero());
        assert_eq!(config.transition.max_attempts, 5);
        assert_eq!(config.transition.retry_deadline, Duration::from_millis(500));
        assert_eq!(config.transition.store_timeout, Duration::from_millis(250));
        assert_eq!(
            config.catalog_path,
            Some(PathBuf::from("/etc/storefront/catalog.json"))
        );
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = from_pairs(&[
            ("PORT", "not-a-port"),
            ("FLAT_SHIPPING_FEE", "-1"),
            ("TRANSITION_MAX_ATTEMPTS", "0"),
            ("LOG_FORMAT", "xml"),
            ("CATALOG_PATH", "  "),
        ]);

        assert_eq!(config.port, 3000);
        assert_eq!(config.pricing.flat_shipping_fee, Money::new(10_000));
        assert_eq!(config.transition.max_attempts, 3);
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.catalog_path.is_none());
    }
}
