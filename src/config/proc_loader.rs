use std::path::Path;

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use tracing::{debug, error};

use crate::config::proc_validator;
use crate::config::service::ServiceConfig;
use crate::config::settings::{LoggingConfig, FALLBACK_TTL_SECONDS_DEFAULT, SAFETY_MARGIN_SECONDS_DEFAULT};
use crate::observability::metrics::get_metrics;

/// Load, expand and validate config from YAML file
pub async fn file_to_config(path: &Path) -> Result<ServiceConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read config '{}'", path.display()))?;

    let expanded = expand_env_vars(&content);
    parse_config(expanded).await
}

pub async fn parse_config(content: String) -> Result<ServiceConfig> {
    let metrics = get_metrics().await;
    let mut service_config: ServiceConfig = serde_yaml::from_str(&content)
        .inspect_err(|e| {
            error!("parse config error: {}", e);
            metrics.config_errors.inc();
        })?;

    // Apply defaults
    let settings = &mut service_config.settings;
    settings.logging.get_or_insert_with(LoggingConfig::default);
    settings.safety_margin_seconds.get_or_insert(SAFETY_MARGIN_SECONDS_DEFAULT);
    settings.fallback_ttl_seconds.get_or_insert(FALLBACK_TTL_SECONDS_DEFAULT);

    debug!("validation config ...");
    proc_validator::validate_service_config(&service_config)
        .await
        .map_err(|errors| anyhow!("invalid config:\n  - {}", errors.join("\n  - ")))?;

    Ok(service_config)
}

/// `${VAR}` / `${VAR:default}` from the process environment
fn expand_env_vars(input: &str) -> String {
    let re = Regex::new(r"\$\{(\w+)(?::([^\}]*))?\}").expect("static regex");
    re.replace_all(input, |caps: &regex::Captures| {
        let var = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(var).unwrap_or_else(|_| default.to_string())
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const MINIMAL: &str = r#"
stores:
  Dunedin: "store-123"
"#;

    #[tokio::test]
    #[serial]
    async fn defaults_are_applied() {
        let cfg = parse_config(MINIMAL.to_owned()).await.unwrap();

        assert_eq!(cfg.settings.safety_margin_seconds, Some(60));
        assert_eq!(cfg.settings.fallback_ttl_seconds, Some(600));
        assert_eq!(cfg.settings.token_cache_path, ".cache/token_cache.json");
        assert_eq!(cfg.browser.settle_seconds, 5);
        assert!(cfg.browser.headless);
        assert_eq!(cfg.watchlist.path, "data/watchlist.json");
        assert_eq!(cfg.store_id("Dunedin").unwrap(), "store-123");
        assert!(cfg.store_id("Chaffers").is_err());
    }

    #[test]
    #[serial]
    fn env_placeholders_expand() {
        std::env::set_var("PROMO_WATCH_TEST_SENDER", "alerts@example.com");
        std::env::remove_var("PROMO_WATCH_TEST_MISSING");

        let out = expand_env_vars("a: ${PROMO_WATCH_TEST_SENDER}\nb: ${PROMO_WATCH_TEST_MISSING:587}\nc: ${PROMO_WATCH_TEST_MISSING}");

        assert_eq!(out, "a: alerts@example.com\nb: 587\nc: ");
        std::env::remove_var("PROMO_WATCH_TEST_SENDER");
    }

    #[tokio::test]
    #[serial]
    async fn invalid_config_lists_every_problem() {
        let content = r#"
settings:
  safety_margin_seconds: 0
api:
  base_url: "not a url"
stores: {}
"#;
        let err = parse_config(content.to_owned()).await.unwrap_err().to_string();

        assert!(err.contains("safety_margin_seconds"), "{}", err);
        assert!(err.contains("api.base_url"), "{}", err);
        assert!(err.contains("stores"), "{}", err);
    }
}
