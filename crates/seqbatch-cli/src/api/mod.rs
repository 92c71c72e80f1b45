//! API client module
//!
//! HTTP client, endpoints and payload types for the submission portal.

pub mod client;
pub mod endpoints;
pub mod error_trail;
pub mod types;

pub use client::{ApiClient, RawResponse};
pub use error_trail::{ErrorTrail, FieldError};
pub use types::*;
