//! Capability-aware backend resolution for Conduit
//!
//! Maps a requested model id to a ranked list of backends using a tiered
//! policy: preferred, then free, then paid cheapest-first, then emergency.
//! Health and quota facts come from the `conduit-state` collaborators.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod capabilities;
pub mod catalog;
pub mod error;
pub mod resolver;

pub use capabilities::RequiredCapabilities;
pub use catalog::{Catalog, Offering};
pub use error::RoutingError;
pub use resolver::{Candidate, ResolutionQuery, ResolutionResult, Resolver, Tier};
