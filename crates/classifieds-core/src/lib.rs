//! Lifecycle evaluators and sweep orchestration for classifiedsd
//!
//! This crate is the heart of classifiedsd, containing:
//! - Pure evaluators deciding the next state of listings, stores, discounts
//!   and campaigns (Active -> GracePeriod -> Archived, Active -> GracePeriod ->
//!   Deactivated -> Archived)
//! - Side effects requested by those decisions (charges, notices, cascades)
//! - Manual user/admin actions
//! - The orchestrator that runs a sweep: charge, commit under a version
//!   guard, then notify

mod effects;
mod error;
mod listing;
mod manual;
mod orchestrator;
mod promo;
mod store;

pub use effects::*;
pub use error::*;
pub use listing::*;
pub use manual::*;
pub use orchestrator::*;
pub use promo::*;
pub use store::*;
