//! Record types for the classifieds lifecycle engine
//!
//! This crate defines the data shared by every other crate:
//! - Listings with their tagged lifecycle state, auto-renewal block and overlays
//! - Stores with their strictly linear status chain
//! - Discounts and campaigns (time-boxed promotional overlays)
//! - The `Entity` envelope and version type used by persistence

mod entity;
mod listing;
mod promo;
mod store;
mod types;

pub use entity::*;
pub use listing::*;
pub use promo::*;
pub use store::*;
pub use types::*;
