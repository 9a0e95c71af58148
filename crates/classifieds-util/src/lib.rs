//! Shared utilities for the classifieds lifecycle engine
//!
//! This crate provides:
//! - ID types (ListingId, StoreId, UserId, DiscountId, CampaignId)
//! - Wall-clock access with a debug-only mock time override
//! - Default paths for config and data directories

mod ids;
mod paths;
mod time;

pub use ids::*;
pub use paths::*;
pub use time::*;
