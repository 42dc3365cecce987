//! Forecast resolution for Nimbus
//!
//! Turns a latitude/longitude pair into the ordered forecast periods published
//! by the National Weather Service API. Resolution is two dependent calls
//! (`/points` then the forecast URL it returns) bounded by one deadline.

pub mod deadline;
pub mod error;
pub mod resolver;
pub mod types;

pub use deadline::Deadline;
pub use error::{ForecastError, Stage};
pub use resolver::{ForecastResolver, ResolverConfig};
pub use types::*;
