//! External collaborator interfaces for classifiedsd
//!
//! This crate defines the boundary between the lifecycle core and the
//! outside world: capturing auto-renewal payments and telling owners what
//! happened to their listings and stores. Production adapters and test
//! doubles live side by side.

mod http;
mod mock;
mod notify;
mod traits;

pub use http::*;
pub use mock::*;
pub use notify::*;
pub use traits::*;
