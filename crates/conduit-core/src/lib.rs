//! Shared vocabulary for the Conduit gateway crates

#![allow(clippy::must_use_candidate)]

pub mod context;
pub mod endpoint;
pub mod error;

pub use context::RequestContext;
pub use endpoint::EndpointKind;
pub use error::HttpError;
