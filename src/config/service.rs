use serde::Deserialize;
use std::collections::BTreeMap;

use crate::config::settings::SettingsConfig;
use crate::errors::{Result, WatchError};

pub const API_BASE_URL_DEFAULT: &str = "https://api-prod.newworld.co.nz/v1/edge";
pub const SEARCH_PAGE_URL_DEFAULT: &str = "https://www.newworld.co.nz/shop/search?pg=1&q";
pub const WATCHLIST_PATH_DEFAULT: &str = "data/watchlist.json";

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ServiceConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub browser: BrowserSettings,
    /// store name -> store id
    #[serde(default)]
    pub stores: BTreeMap<String, String>,
    #[serde(default)]
    pub watchlist: WatchlistConfig,
    pub email: Option<EmailConfig>,
}

impl ServiceConfig {
    /// Resolve a store name (as kept in the watchlist) to its catalog id.
    pub fn store_id(&self, store_name: &str) -> Result<&str> {
        self.stores
            .get(store_name)
            .map(|id| id.as_str())
            .ok_or_else(|| WatchError::Config(format!("store '{}' not found in store list", store_name)))
    }
}

/// ================================
/// Search API
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
        }
    }
}

/// ================================
/// Token harvesting browser
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct BrowserSettings {
    /// page whose own API calls carry the bearer token
    #[serde(default = "default_search_page_url")]
    pub search_page_url: String,
    /// wait after load for asynchronous requests
    #[serde(default = "default_settle_seconds")]
    pub settle_seconds: u64,
    #[serde(default = "default_navigation_timeout_seconds")]
    pub navigation_timeout_seconds: u64,
    #[serde(default = "default_true")]
    pub headless: bool,
    #[serde(default)]
    pub no_sandbox: bool,
    /// chromium binary; auto-detected when absent
    pub executable: Option<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            search_page_url: default_search_page_url(),
            settle_seconds: default_settle_seconds(),
            navigation_timeout_seconds: default_navigation_timeout_seconds(),
            headless: true,
            no_sandbox: false,
            executable: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WatchlistConfig {
    #[serde(default = "default_watchlist_path")]
    pub path: String,
}

impl Default for WatchlistConfig {
    fn default() -> Self {
        Self {
            path: default_watchlist_path(),
        }
    }
}

/// ================================
/// Alert email (SMTP)
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub sender: String,
    pub recipient: String,
    #[serde(default = "default_subject")]
    pub subject: String,
}

fn default_api_base_url() -> String {
    API_BASE_URL_DEFAULT.to_owned()
}

fn default_search_page_url() -> String {
    SEARCH_PAGE_URL_DEFAULT.to_owned()
}

fn default_settle_seconds() -> u64 {
    5
}

fn default_navigation_timeout_seconds() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_watchlist_path() -> String {
    WATCHLIST_PATH_DEFAULT.to_owned()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_subject() -> String {
    "NewWorld Specials Alert".to_owned()
}
