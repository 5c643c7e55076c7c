//! # Promo Watch Library
//!
//! Watches a grocery retailer's catalog for promotions. A bearer token is
//! harvested from the retailer's web app with a headless browser, cached on
//! disk until shortly before it expires, and replayed against the product
//! search API. A daily check compares watched products against price and
//! discount thresholds and emails the alerts.
//!
//! Modules:
//! - `config` — service configuration, loading and validation
//! - `cache` — bearer token, held-token state and the on-disk token cache
//! - `sources` — token sources (headless browser)
//! - `parser` — JWT expiry decoding
//! - `api` — search request builder, response models and the API client
//! - `watchlist` — watchlist store, evaluator and the daily check
//! - `notify` — alert email

pub mod api;
pub mod cache;
pub mod config;
pub mod errors;
pub mod helpers;
pub mod notify;
pub mod observability;
pub mod parser;
pub mod sources;
pub mod utils;
pub mod watchlist;

#[cfg(test)]
mod tests;

pub use crate::config::service::ServiceConfig;
pub use crate::errors::{Result, WatchError};
