//! REST API client module for the sales/inventory service.
//!
//! This module provides the `ApiClient` for products, customers, sales and
//! reports, and the `AuthPipeline` every call goes through.
//!
//! The API uses JWT bearer authentication. Access credentials are obtained
//! from `token/` and renewed from `token/refresh/` without the caller noticing.

pub mod client;
pub mod error;
pub mod pipeline;

pub use client::{ApiClient, ListQuery};
pub use error::ApiError;
pub use pipeline::{ApiRequest, AuthPipeline};
