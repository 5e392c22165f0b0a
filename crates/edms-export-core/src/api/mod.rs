//! HTTP client module for the ASEE survey and EDMS report services.
//!
//! This module provides the `ApiClient` for logging in (which yields a
//! `.SharedCookie` session cookie) and for exporting report query results
//! as CSV using that cookie.

pub mod client;
pub mod error;

pub use client::{ApiClient, Endpoints};
pub use error::ApiError;
