//! Product search API

pub mod client;
pub mod models;
pub mod query;

pub use client::{ApiClient, ClientSettings};
pub use models::{ProductRecord, ProductSearchResult};
pub use query::SearchQuery;
