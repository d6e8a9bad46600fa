//! hk-core: stable foundation for hydrokit.
//!
//! Contains:
//! - time ("`<unit> since <reference>`" unit strings and offset conversion)
//! - catalog (forcing types, interpolation modes, location types, kernel quantity names)
//! - series (typed data series exposed by named support points)
//! - error (shared error types)

pub mod catalog;
pub mod error;
pub mod series;
pub mod time;

// Re-exports: nice ergonomics for downstream crates
pub use catalog::*;
pub use error::{CoreError, CoreResult};
pub use series::*;
pub use time::*;
