//! Configuration validation

use crate::schema::{RawConfig, RawLifecycle, RawPackage, RawPayments, RawServiceConfig};
use classifieds_model::AdType;
use std::collections::HashSet;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Package '{ad_type}': {message}")]
    PackageError { ad_type: String, message: String },

    #[error("Duplicate package for ad type: {0}")]
    DuplicatePackage(String),

    #[error("Unknown ad type: {0}")]
    UnknownAdType(String),

    #[error("Invalid currency '{value}' for package '{ad_type}'")]
    InvalidCurrency { ad_type: String, value: String },

    #[error("[service] {0}")]
    ServiceError(String),

    #[error("[lifecycle] {0}")]
    LifecycleError(String),

    #[error("[payments] {0}")]
    PaymentsError(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    errors.extend(validate_service(&config.service));
    errors.extend(validate_lifecycle(&config.lifecycle));
    errors.extend(validate_payments(&config.payments));

    let mut seen = HashSet::new();
    for package in &config.packages {
        if !seen.insert(package.ad_type.as_str()) {
            errors.push(ValidationError::DuplicatePackage(package.ad_type.clone()));
        }
        errors.extend(validate_package(package));
    }

    errors
}

fn validate_service(service: &RawServiceConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if service.sweep_interval_seconds == Some(0) {
        errors.push(ValidationError::ServiceError(
            "sweep_interval_seconds must be positive".into(),
        ));
    }
    if service.workers == Some(0) {
        errors.push(ValidationError::ServiceError("workers must be positive".into()));
    }
    if service.store_timeout_ms == Some(0) {
        errors.push(ValidationError::ServiceError(
            "store_timeout_ms must be positive".into(),
        ));
    }
    if service.payment_timeout_ms == Some(0) {
        errors.push(ValidationError::ServiceError(
            "payment_timeout_ms must be positive".into(),
        ));
    }
    if service.batch_limit == Some(0) {
        errors.push(ValidationError::ServiceError("batch_limit must be positive".into()));
    }
    if service.invalid_backoff_seconds == Some(0) {
        errors.push(ValidationError::ServiceError(
            "invalid_backoff_seconds must be positive".into(),
        ));
    }

    errors
}

fn validate_lifecycle(lifecycle: &RawLifecycle) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let windows = [
        ("listing_grace_days", lifecycle.listing_grace_days),
        ("store_grace_days", lifecycle.store_grace_days),
        ("store_archive_after_days", lifecycle.store_archive_after_days),
        ("renewal_retry_hours", lifecycle.renewal_retry_hours),
    ];
    for (name, value) in windows {
        if let Some(v) = value
            && v <= 0
        {
            errors.push(ValidationError::LifecycleError(format!(
                "{} must be positive, got {}",
                name, v
            )));
        }
    }

    // A zero reminder lead is allowed: reminders then go out at expiry
    if let Some(v) = lifecycle.store_reminder_days
        && v < 0
    {
        errors.push(ValidationError::LifecycleError(format!(
            "store_reminder_days cannot be negative, got {}",
            v
        )));
    }

    errors
}

fn validate_payments(payments: &RawPayments) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(endpoint) = &payments.endpoint
        && !(endpoint.starts_with("https://") || endpoint.starts_with("http://"))
    {
        errors.push(ValidationError::PaymentsError(format!(
            "endpoint must be an http(s) URL, got '{}'",
            endpoint
        )));
    }

    if let Some(var) = &payments.api_key_env
        && var.trim().is_empty()
    {
        errors.push(ValidationError::PaymentsError(
            "api_key_env cannot be empty".into(),
        ));
    }

    errors
}

fn validate_package(package: &RawPackage) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let ad_type = match package.ad_type.parse::<AdType>() {
        Ok(t) => t,
        Err(_) => {
            errors.push(ValidationError::UnknownAdType(package.ad_type.clone()));
            return errors;
        }
    };

    if package.duration_days <= 0 {
        errors.push(ValidationError::PackageError {
            ad_type: package.ad_type.clone(),
            message: format!("duration_days must be positive, got {}", package.duration_days),
        });
    }

    if package.price_minor < 0 {
        errors.push(ValidationError::PackageError {
            ad_type: package.ad_type.clone(),
            message: "price_minor cannot be negative".into(),
        });
    } else if ad_type.is_paid() && package.price_minor == 0 {
        errors.push(ValidationError::PackageError {
            ad_type: package.ad_type.clone(),
            message: "paid tiers need a non-zero price".into(),
        });
    } else if !ad_type.is_paid() && package.price_minor != 0 {
        errors.push(ValidationError::PackageError {
            ad_type: package.ad_type.clone(),
            message: "the free tier cannot carry a price".into(),
        });
    }

    if !is_valid_currency(&package.currency) {
        errors.push(ValidationError::InvalidCurrency {
            ad_type: package.ad_type.clone(),
            value: package.currency.clone(),
        });
    }

    errors
}

/// ISO 4217 shape: three upper-case ASCII letters
pub fn is_valid_currency(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase())
}
