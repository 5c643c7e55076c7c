//! Token sources
//!
//! A source produces a fresh raw bearer credential. The client decodes its
//! expiry and persists it; sources know nothing about caching.

use std::future::Future;

use crate::errors::Result;

pub mod browser;

pub trait TokenSource {
    /// Obtain a fresh credential (without expiry). Expensive; callers go to
    /// the cache first.
    fn acquire_token(&self) -> impl Future<Output = Result<String>> + Send;
}
