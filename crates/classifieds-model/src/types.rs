//! Shared value types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Ad tier of a listing; selects the package (duration, price, promotion rights)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdType {
    Free,
    Standard,
    Colored,
    AutoRenewal,
    Premium,
    Vip,
    Featured,
}

impl AdType {
    pub const ALL: [AdType; 7] = [
        AdType::Free,
        AdType::Standard,
        AdType::Colored,
        AdType::AutoRenewal,
        AdType::Premium,
        AdType::Vip,
        AdType::Featured,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AdType::Free => "free",
            AdType::Standard => "standard",
            AdType::Colored => "colored",
            AdType::AutoRenewal => "auto_renewal",
            AdType::Premium => "premium",
            AdType::Vip => "vip",
            AdType::Featured => "featured",
        }
    }

    /// Whether the tier is charged for at all
    pub fn is_paid(&self) -> bool {
        !matches!(self, AdType::Free)
    }
}

impl fmt::Display for AdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown ad type: {0}")]
pub struct ParseAdTypeError(pub String);

impl FromStr for AdType {
    type Err = ParseAdTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AdType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ParseAdTypeError(s.to_string()))
    }
}

/// An amount of money in minor units (kuruş, cents) of a currency
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    pub amount_minor: i64,
    /// ISO 4217 code, upper case
    pub currency: String,
}

impl Money {
    pub fn new(amount_minor: i64, currency: impl Into<String>) -> Self {
        Self {
            amount_minor,
            currency: currency.into(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.amount_minor == 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.amount_minor < 0 { "-" } else { "" };
        let abs = self.amount_minor.unsigned_abs();
        write!(f, "{}{}.{:02} {}", sign, abs / 100, abs % 100, self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ad_type_round_trips_through_str() {
        for ad_type in AdType::ALL {
            assert_eq!(ad_type.as_str().parse::<AdType>().unwrap(), ad_type);
        }
        assert!("gold".parse::<AdType>().is_err());
    }

    #[test]
    fn ad_type_serializes_snake_case() {
        let json = serde_json::to_string(&AdType::AutoRenewal).unwrap();
        assert_eq!(json, "\"auto_renewal\"");
    }

    #[test]
    fn money_display() {
        assert_eq!(Money::new(12_50, "TRY").to_string(), "12.50 TRY");
        assert_eq!(Money::new(5, "EUR").to_string(), "0.05 EUR");
        assert_eq!(Money::new(-150, "USD").to_string(), "-1.50 USD");
    }
}
