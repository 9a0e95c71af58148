//! Validated configuration structures

use crate::schema::{RawConfig, RawLifecycle, RawPackage, RawPayments, RawServiceConfig};
use chrono::Duration;
use classifieds_model::{AdType, DueHints, Money};
use classifieds_util::data_dir_without_env;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration as StdDuration;

/// Validated configuration ready for use by the daemon
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub service: ServiceConfig,
    pub lifecycle: LifecyclePolicy,
    pub payments: PaymentsConfig,
}

impl Config {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            service: ServiceConfig::from_raw(raw.service),
            lifecycle: LifecyclePolicy::from_raw(raw.lifecycle, raw.packages),
            payments: PaymentsConfig::from_raw(raw.payments),
        }
    }
}

/// Sweep scheduling and resource bounds
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub data_dir: PathBuf,
    pub sweep_interval: StdDuration,
    pub workers: usize,
    pub store_timeout: StdDuration,
    pub payment_timeout: StdDuration,
    pub batch_limit: usize,
    /// Time an invalid record is left out of the due set
    pub invalid_backoff: StdDuration,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        let defaults = Self::default();
        Self {
            data_dir: raw.data_dir.unwrap_or(defaults.data_dir),
            sweep_interval: raw
                .sweep_interval_seconds
                .map(StdDuration::from_secs)
                .unwrap_or(defaults.sweep_interval),
            workers: raw.workers.unwrap_or(defaults.workers),
            store_timeout: raw
                .store_timeout_ms
                .map(StdDuration::from_millis)
                .unwrap_or(defaults.store_timeout),
            payment_timeout: raw
                .payment_timeout_ms
                .map(StdDuration::from_millis)
                .unwrap_or(defaults.payment_timeout),
            batch_limit: raw.batch_limit.unwrap_or(defaults.batch_limit),
            invalid_backoff: raw
                .invalid_backoff_seconds
                .map(StdDuration::from_secs)
                .unwrap_or(defaults.invalid_backoff),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: data_dir_without_env(),
            sweep_interval: StdDuration::from_secs(300),
            workers: 8,
            store_timeout: StdDuration::from_millis(2_000),
            payment_timeout: StdDuration::from_millis(10_000),
            batch_limit: 500,
            invalid_backoff: StdDuration::from_secs(3_600),
        }
    }
}

/// Payment gateway connection settings
#[derive(Debug, Clone, Default)]
pub struct PaymentsConfig {
    pub endpoint: Option<String>,
    pub api_key_env: Option<String>,
}

impl PaymentsConfig {
    fn from_raw(raw: RawPayments) -> Self {
        Self {
            endpoint: raw.endpoint,
            api_key_env: raw.api_key_env,
        }
    }
}

/// What one period of a given ad tier costs and how long it lasts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub ad_type: AdType,
    pub duration: Duration,
    pub price: Money,
    pub allows_promotion: bool,
}

/// Windows and packages consumed by the lifecycle evaluators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecyclePolicy {
    /// Listing grace period after expiry
    pub listing_grace: Duration,
    /// Store grace period after expiry
    pub store_grace: Duration,
    /// Retention between store deactivation and archival
    pub store_archive_after: Duration,
    /// Payment reminder lead before a store expires
    pub store_reminder_before: Duration,
    /// Spacing between auto-renewal retries during grace
    pub renewal_retry_interval: Duration,
    packages: HashMap<AdType, Package>,
}

impl LifecyclePolicy {
    fn from_raw(raw: RawLifecycle, packages: Vec<RawPackage>) -> Self {
        let mut policy = Self::default();

        if let Some(days) = raw.listing_grace_days {
            policy.listing_grace = Duration::days(days);
        }
        if let Some(days) = raw.store_grace_days {
            policy.store_grace = Duration::days(days);
        }
        if let Some(days) = raw.store_archive_after_days {
            policy.store_archive_after = Duration::days(days);
        }
        if let Some(days) = raw.store_reminder_days {
            policy.store_reminder_before = Duration::days(days);
        }
        if let Some(hours) = raw.renewal_retry_hours {
            policy.renewal_retry_interval = Duration::hours(hours);
        }

        for raw_package in packages {
            // Validation has already rejected unknown tiers
            if let Ok(ad_type) = raw_package.ad_type.parse::<AdType>() {
                policy.packages.insert(
                    ad_type,
                    Package {
                        ad_type,
                        duration: Duration::days(raw_package.duration_days),
                        price: Money::new(raw_package.price_minor, raw_package.currency),
                        allows_promotion: raw_package.allows_promotion,
                    },
                );
            }
        }

        policy
    }

    /// Package for a tier. Every tier has one: configured or built in.
    pub fn package(&self, ad_type: AdType) -> Option<&Package> {
        self.packages.get(&ad_type)
    }

    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        AdType::ALL.into_iter().filter_map(|t| self.packages.get(&t))
    }

    /// Replace or add a package (used by tests and admin tooling)
    pub fn with_package(mut self, package: Package) -> Self {
        self.packages.insert(package.ad_type, package);
        self
    }

    /// Lead times persistence needs to schedule store evaluations
    pub fn due_hints(&self) -> DueHints {
        DueHints {
            store_reminder_before: self.store_reminder_before,
            store_archive_after: self.store_archive_after,
        }
    }
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            listing_grace: Duration::days(7),
            store_grace: Duration::days(7),
            store_archive_after: Duration::days(30),
            store_reminder_before: Duration::days(3),
            renewal_retry_interval: Duration::hours(24),
            packages: default_packages(),
        }
    }
}

fn default_packages() -> HashMap<AdType, Package> {
    let table = [
        (AdType::Free, 30, 0, false),
        (AdType::Standard, 30, 4_900, false),
        (AdType::Colored, 30, 7_900, false),
        (AdType::AutoRenewal, 30, 9_900, false),
        (AdType::Premium, 30, 14_900, true),
        (AdType::Vip, 30, 24_900, true),
        (AdType::Featured, 14, 19_900, true),
    ];

    table
        .into_iter()
        .map(|(ad_type, days, price, allows_promotion)| {
            (
                ad_type,
                Package {
                    ad_type,
                    duration: Duration::days(days),
                    price: Money::new(price, "USD"),
                    allows_promotion,
                },
            )
        })
        .collect()
}
