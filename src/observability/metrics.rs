use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use tokio::sync::OnceCell;
use tracing::info;

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE
        .get_or_init(|| async {
            info!("Initializing Metrics ...");
            Metrics::new()
        })
        .await
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Token lifecycle
    pub token_acquisitions: IntCounterVec,
    pub token_cache_lookups: IntCounterVec,
    pub token_expiry_unix: IntGauge,

    // Search API
    pub api_requests: IntCounterVec,
    pub api_failures: IntCounterVec,
    pub api_duration: HistogramVec,

    // Daily check
    pub products_checked: IntCounter,
    pub products_skipped: IntCounter,
    pub alerts_raised: IntCounter,
    pub emails_sent: IntCounter,

    // Config/runtime
    pub config_errors: IntCounter,
    pub last_run_unix: IntGauge,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("promowatch".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            token_acquisitions: IntCounterVec::new(Opts::new("token_acquisitions_total", "Browser token acquisitions by outcome"), &["outcome"]).unwrap(),
            token_cache_lookups: IntCounterVec::new(Opts::new("token_cache_lookups_total", "Token cache lookups by result"), &["result"]).unwrap(),
            token_expiry_unix: IntGauge::new("token_expiry_unix_seconds", "Expiry of the token in use").unwrap(),

            api_requests: IntCounterVec::new(Opts::new("api_requests_total", "Search API requests"), &["operation"]).unwrap(),
            api_failures: IntCounterVec::new(Opts::new("api_failures_total", "Search API failures by reason"), &["operation", "reason"]).unwrap(),
            api_duration: HistogramVec::new(HistogramOpts::new("api_request_duration_seconds", "Search API request duration").buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]), &["operation"]).unwrap(),

            products_checked: IntCounter::new("products_checked_total", "Watchlist products evaluated").unwrap(),
            products_skipped: IntCounter::new("products_skipped_total", "Watchlist products skipped after a failure").unwrap(),
            alerts_raised: IntCounter::new("alerts_raised_total", "Alerts produced by the daily check").unwrap(),
            emails_sent: IntCounter::new("emails_sent_total", "Alert emails dispatched").unwrap(),

            config_errors: IntCounter::new("config_errors_total", "Parse/validation errors during startup").unwrap(),
            last_run_unix: IntGauge::new("last_run_unix_seconds", "Completion time of the last daily check").unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.token_acquisitions.clone())).unwrap();
        reg.register(Box::new(metrics.token_cache_lookups.clone())).unwrap();
        reg.register(Box::new(metrics.token_expiry_unix.clone())).unwrap();
        reg.register(Box::new(metrics.api_requests.clone())).unwrap();
        reg.register(Box::new(metrics.api_failures.clone())).unwrap();
        reg.register(Box::new(metrics.api_duration.clone())).unwrap();
        reg.register(Box::new(metrics.products_checked.clone())).unwrap();
        reg.register(Box::new(metrics.products_skipped.clone())).unwrap();
        reg.register(Box::new(metrics.alerts_raised.clone())).unwrap();
        reg.register(Box::new(metrics.emails_sent.clone())).unwrap();
        reg.register(Box::new(metrics.config_errors.clone())).unwrap();
        reg.register(Box::new(metrics.last_run_unix.clone())).unwrap();

        metrics
    }

    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Write the exposition text next to `path` and rename it in place, so a
    /// collector never reads a half-written file.
    pub async fn write_textfile(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("prom.tmp");
        tokio::fs::write(&tmp, self.render()?).await?;
        tokio::fs::rename(&tmp, path).await?;
        info!(path = %path.display(), "metrics written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[tokio::test]
    #[serial]
    async fn textfile_contains_namespaced_series() {
        let metrics = get_metrics().await;
        metrics.api_requests.with_label_values(&["search"]).inc();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node").join("promo_watch.prom");
        metrics.write_textfile(&path).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("promowatch_api_requests_total{operation=\"search\"}"));
        assert!(!path.with_extension("prom.tmp").exists());
    }
}
