//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Checks settings, endpoint URLs, browser timings, stores and email addresses

use lettre::message::Mailbox;
use reqwest::Url;
use tracing::{error, info};

use crate::config::service::{BrowserSettings, EmailConfig, ServiceConfig};
use crate::config::settings::SettingsConfig;
use crate::observability::metrics::get_metrics;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub async fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_settings(&cfg.settings, &mut errors);
    validate_url("api.base_url", &cfg.api.base_url, &mut errors);
    validate_browser(&cfg.browser, &mut errors);

    if cfg.stores.is_empty() {
        errors.push("config: 'stores' is empty; at least one store required".to_string());
    }
    for (name, id) in &cfg.stores {
        if id.trim().is_empty() {
            errors.push(format!("stores['{}']: store id must not be empty", name));
        }
    }

    if cfg.watchlist.path.trim().is_empty() {
        errors.push("watchlist.path must not be empty".to_string());
    }

    if let Some(email) = &cfg.email {
        validate_email(email, &mut errors);
    }

    if errors.is_empty() {
        info!("config validated");
        Ok(())
    } else {
        let metrics = get_metrics().await;
        for e in &errors {
            error!("config: {}", e);
            metrics.config_errors.inc();
        }
        Err(errors)
    }
}

fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    if settings.safety_margin_seconds == Some(0) {
        errors.push("settings.safety_margin_seconds must be > 0".to_string());
    }
    if settings.fallback_ttl_seconds == Some(0) {
        errors.push("settings.fallback_ttl_seconds must be > 0".to_string());
    }
    if let (Some(margin), Some(ttl)) = (settings.safety_margin_seconds, settings.fallback_ttl_seconds) {
        if ttl <= margin {
            errors.push(format!(
                "settings.fallback_ttl_seconds ({}) must exceed safety_margin_seconds ({}), otherwise fallback tokens are never usable",
                ttl, margin
            ));
        }
    }
    if settings.token_cache_path.trim().is_empty() {
        errors.push("settings.token_cache_path must not be empty".to_string());
    }
    if settings.request_timeout_ms == Some(0) {
        errors.push("settings.request_timeout_ms must be > 0 when set".to_string());
    }
    if settings.metrics.is_enabled && settings.metrics.textfile_path.is_none() {
        errors.push("settings.metrics.textfile_path required when metrics are enabled".to_string());
    }
    if let Some(logging) = &settings.logging {
        if !LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
            errors.push(format!(
                "settings.logging.level '{}' must be one of {:?}",
                logging.level, LOG_LEVELS
            ));
        }
    }
}

fn validate_browser(browser: &BrowserSettings, errors: &mut Vec<String>) {
    validate_url("browser.search_page_url", &browser.search_page_url, errors);
    if browser.settle_seconds == 0 {
        errors.push("browser.settle_seconds must be > 0".to_string());
    }
    if browser.navigation_timeout_seconds == 0 {
        errors.push("browser.navigation_timeout_seconds must be > 0".to_string());
    }
    if let Some(path) = &browser.executable {
        if path.trim().is_empty() {
            errors.push("browser.executable must not be empty when set".to_string());
        }
    }
}

fn validate_email(email: &EmailConfig, errors: &mut Vec<String>) {
    if email.smtp_host.trim().is_empty() {
        errors.push("email.smtp_host must not be empty".to_string());
    }
    for (field, value) in [("email.sender", &email.sender), ("email.recipient", &email.recipient)] {
        if let Err(e) = value.parse::<Mailbox>() {
            errors.push(format!("{} '{}' is not a valid address: {}", field, value, e));
        }
    }
    if email.username.is_some() != email.password.is_some() {
        errors.push("email.username and email.password must be set together".to_string());
    }
}

fn validate_url(field: &str, value: &str, errors: &mut Vec<String>) {
    match Url::parse(value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(format!("{} '{}' has unsupported scheme '{}'", field, value, url.scheme())),
        Err(e) => errors.push(format!("{} '{}' is not a valid URL: {}", field, value, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::service::EmailConfig;
    use serial_test::serial;

    fn valid_config() -> ServiceConfig {
        let mut cfg = ServiceConfig::default();
        cfg.stores.insert("Dunedin".to_owned(), "store-123".to_owned());
        cfg
    }

    fn email(sender: &str) -> EmailConfig {
        EmailConfig {
            smtp_host: "smtp.example.com".to_owned(),
            smtp_port: 587,
            username: Some("user".to_owned()),
            password: None,
            sender: sender.to_owned(),
            recipient: "me@example.com".to_owned(),
            subject: "NewWorld Specials Alert".to_owned(),
        }
    }

    #[tokio::test]
    #[serial]
    async fn default_config_with_store_is_valid() {
        assert!(validate_service_config(&valid_config()).await.is_ok());
    }

    #[tokio::test]
    #[serial]
    async fn email_problems_are_aggregated() {
        let mut cfg = valid_config();
        cfg.email = Some(email("not-an-address"));

        let errors = validate_service_config(&cfg).await.unwrap_err();

        assert_eq!(errors.len(), 2, "{:?}", errors);
        assert!(errors.iter().any(|e| e.starts_with("email.sender")));
        assert!(errors.iter().any(|e| e.contains("set together")));
    }

    #[tokio::test]
    #[serial]
    async fn fallback_must_outlive_margin() {
        let mut cfg = valid_config();
        cfg.settings.fallback_ttl_seconds = Some(30);

        let errors = validate_service_config(&cfg).await.unwrap_err();

        assert!(errors[0].contains("fallback_ttl_seconds (30)"));
    }

    #[tokio::test]
    #[serial]
    async fn metrics_need_a_target() {
        let mut cfg = valid_config();
        cfg.settings.metrics.is_enabled = true;

        let errors = validate_service_config(&cfg).await.unwrap_err();

        assert!(errors[0].contains("textfile_path"));
    }
}
