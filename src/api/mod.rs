//! Vendor REST API access.
//!
//! Wraps `reqwest` with bearer auth and maps HTTP failures onto the
//! transient/permanent/not-found split that lookups report.

pub mod client;
pub mod error;

pub use client::{ApiClient, ApiConfig, DEFAULT_API_BASE, DEFAULT_TIMEOUT};
pub use error::{ApiError, ApiErrorKind};
