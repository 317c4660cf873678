//! Data models for the sales API.
//!
//! This module contains the data structures exchanged with the remote API:
//!
//! - `Product`, `ProductInput`: catalog items and their create/update form
//! - `Customer`, `CustomerInput`: customers and their create/update form
//! - `Sale`, `SaleLine`, `SaleDraft`: recorded sales and new-sale input
//! - `Page`: list responses, paginated or bare
//! - `ReportRange`: date range for the sales report
//!
//! Field names follow the API's Spanish wire names through serde renames.

pub mod customer;
pub mod page;
pub mod product;
pub mod report;
pub mod sale;

mod decimal;

pub use customer::{Customer, CustomerInput};
pub use page::Page;
pub use product::{Product, ProductInput};
pub use report::ReportRange;
pub use sale::{CustomerRef, DraftLine, NewSale, NewSaleLine, Sale, SaleDraft, SaleLine};
