//! Strongly-typed identifiers for marketplace records

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a fresh random identifier
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of a classified ad
    ListingId
);

string_id!(
    /// Identifier of a seller's store
    StoreId
);

string_id!(
    /// Identifier of a marketplace user (listing or store owner)
    UserId
);

string_id!(
    /// Identifier of a discount overlay
    DiscountId
);

string_id!(
    /// Identifier of a promotional campaign
    CampaignId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_id_equality() {
        let id1 = ListingId::new("ad-1");
        let id2 = ListingId::new("ad-1");
        let id3 = ListingId::new("ad-2");

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn generated_ids_are_unique() {
        let s1 = StoreId::generate();
        let s2 = StoreId::generate();
        assert_ne!(s1, s2);
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let listing_id = ListingId::new("ad-42");
        let json = serde_json::to_string(&listing_id).unwrap();
        assert_eq!(json, "\"ad-42\"");

        let parsed: ListingId = serde_json::from_str(&json).unwrap();
        assert_eq!(listing_id, parsed);
    }
}
