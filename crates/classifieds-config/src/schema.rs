//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Sweep scheduling and resource bounds
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Grace, retention and retry windows
    #[serde(default)]
    pub lifecycle: RawLifecycle,

    /// Payment gateway connection
    #[serde(default)]
    pub payments: RawPayments,

    /// Per-tier packages; tiers left out keep their built-in package
    #[serde(default)]
    pub packages: Vec<RawPackage>,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// Data directory for the database
    pub data_dir: Option<PathBuf>,

    /// Seconds between sweeps (default: 300)
    pub sweep_interval_seconds: Option<u64>,

    /// Entities evaluated in parallel (default: 8)
    pub workers: Option<usize>,

    /// Bound on a single persistence call (default: 2000)
    pub store_timeout_ms: Option<u64>,

    /// Bound on a single payment call (default: 10000)
    pub payment_timeout_ms: Option<u64>,

    /// Maximum records of one kind loaded per sweep (default: 500)
    pub batch_limit: Option<usize>,

    /// Seconds an invalid record waits before the next evaluation (default: 3600)
    pub invalid_backoff_seconds: Option<u64>,
}

/// Lifecycle windows, in days/hours
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawLifecycle {
    pub listing_grace_days: Option<i64>,
    pub store_grace_days: Option<i64>,
    pub store_archive_after_days: Option<i64>,
    pub store_reminder_days: Option<i64>,
    pub renewal_retry_hours: Option<i64>,
}

/// Payment gateway settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawPayments {
    /// Charge endpoint; when absent the daemon refuses to auto-renew
    pub endpoint: Option<String>,

    /// Name of the environment variable holding the API key
    pub api_key_env: Option<String>,
}

/// Package definition for one ad tier
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawPackage {
    /// One of: free, standard, colored, auto_renewal, premium, vip, featured
    pub ad_type: String,

    /// Length of one listing period
    pub duration_days: i64,

    /// Renewal price in minor currency units
    #[serde(default)]
    pub price_minor: i64,

    /// ISO 4217 currency code
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Whether listings of this tier may carry a promotion window
    #[serde(default)]
    pub allows_promotion: bool,
}

pub(crate) fn default_currency() -> String {
    "USD".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_packages() {
        let toml_str = r#"
            config_version = 1

            [[packages]]
            ad_type = "vip"
            duration_days = 30
            price_minor = 24900
            currency = "TRY"
            allows_promotion = true
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.packages.len(), 1);
        assert_eq!(config.packages[0].ad_type, "vip");
        assert!(config.packages[0].allows_promotion);
    }

    #[test]
    fn sections_default_when_missing() {
        let config: RawConfig = toml::from_str("config_version = 1").unwrap();
        assert!(config.service.workers.is_none());
        assert!(config.lifecycle.listing_grace_days.is_none());
        assert!(config.payments.endpoint.is_none());
        assert!(config.packages.is_empty());
    }

    #[test]
    fn package_currency_defaults() {
        let toml_str = r#"
            config_version = 1

            [[packages]]
            ad_type = "free"
            duration_days = 30
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.packages[0].currency, "USD");
        assert_eq!(config.packages[0].price_minor, 0);
    }
}
