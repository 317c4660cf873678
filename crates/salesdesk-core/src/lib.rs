//! Core library for salesdesk.
//!
//! Session management, the authenticated request pipeline, the REST client
//! for products, customers, sales and reports, and configuration.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod utils;

pub use api::{ApiClient, ApiError, ListQuery};
pub use auth::{AuthError, Session};
pub use config::{Config, RefreshMode};
