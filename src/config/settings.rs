use serde::Deserialize;

use crate::cache::token_cache::TOKEN_CACHE_PATH_DEFAULT;

pub const SAFETY_MARGIN_SECONDS_DEFAULT: u64 = 60;
pub const FALLBACK_TTL_SECONDS_DEFAULT: u64 = 600;

/// ================================
/// Global service-wide settings
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct SettingsConfig {
    pub safety_margin_seconds: Option<u64>,
    /// lifetime assumed for tokens whose claims can't be decoded
    pub fallback_ttl_seconds: Option<u64>,
    #[serde(default = "default_token_cache_path")]
    pub token_cache_path: String,
    /// extra bound on search requests; transport defaults when absent
    pub request_timeout_ms: Option<u64>,
    #[serde(default)]
    pub metrics: MetricsConfig,
    pub logging: Option<LoggingConfig>,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            safety_margin_seconds: Some(SAFETY_MARGIN_SECONDS_DEFAULT),
            fallback_ttl_seconds: Some(FALLBACK_TTL_SECONDS_DEFAULT),
            token_cache_path: default_token_cache_path(),
            request_timeout_ms: None,
            metrics: MetricsConfig::default(),
            logging: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MetricsConfig {
    #[serde(default)]
    pub is_enabled: bool,
    /// node-exporter textfile collector target, written at the end of a run
    pub textfile_path: Option<String>,
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new(level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new("info".to_owned(), LogFormat::Compact)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

fn default_token_cache_path() -> String {
    TOKEN_CACHE_PATH_DEFAULT.to_string()
}
