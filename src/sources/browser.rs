use std::fmt::Display;
use std::future::Future;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::network::EventRequestWillBeSent;
use chromiumoxide::{Browser, BrowserConfig};
use futures::{Stream, StreamExt};
use regex::Regex;
use serde_json::Value;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::config::service::BrowserSettings;
use crate::errors::{Result, WatchError};
use crate::observability::metrics::get_metrics;
use crate::sources::TokenSource;

/// Upper bound for each browser teardown step before the process is killed.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

static BEARER_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*bearer\s+(\S+)\s*$").expect("static regex"));

/// Harvests the bearer token the retailer's own web app sends with its API
/// calls, by loading the search page in a throwaway headless chromium.
#[derive(Debug, Clone)]
pub struct BrowserTokenExtractor {
    search_page_url: String,
    settle: Duration,
    navigation_timeout: Duration,
    headless: bool,
    no_sandbox: bool,
    executable: Option<PathBuf>,
}

impl BrowserTokenExtractor {
    pub fn new(settings: &BrowserSettings) -> Self {
        Self {
            search_page_url: settings.search_page_url.to_owned(),
            settle: Duration::from_secs(settings.settle_seconds),
            navigation_timeout: Duration::from_secs(settings.navigation_timeout_seconds),
            headless: settings.headless,
            no_sandbox: settings.no_sandbox,
            executable: settings.executable.as_ref().map(PathBuf::from),
        }
    }

    fn browser_config(&self) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .incognito()
            .launch_timeout(self.navigation_timeout)
            .request_timeout(self.navigation_timeout);
        if !self.headless {
            builder = builder.with_head();
        }
        if self.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        builder.build().map_err(WatchError::Browser)
    }

    /// Navigate and watch request headers until a bearer credential shows up
    /// or the settle window after load runs out.
    async fn observe(&self, browser: &Browser) -> Result<String> {
        let page = browser.new_page("about:blank").await?;
        let requests = page.event_listener::<EventRequestWillBeSent>().await?.map(|event| {
            debug!(url = %event.request.url, "request observed");
            event.request.headers.inner().clone()
        });

        match timeout(self.navigation_timeout, page.goto(self.search_page_url.as_str())).await {
            Ok(Ok(_)) => debug!(url = %self.search_page_url, "search page loaded"),
            // requests fired before the failure are still buffered; keep looking
            Ok(Err(e)) => warn!(url = %self.search_page_url, "navigation failed: {}", e),
            Err(_) => warn!(url = %self.search_page_url, "navigation timed out after {:?}", self.navigation_timeout),
        }

        first_bearer(requests, self.settle).await
    }
}

/// First bearer credential among the request headers on `requests`.
/// `TokenNotFound` once `settle` elapses or the stream ends.
pub(crate) async fn first_bearer<S>(requests: S, settle: Duration) -> Result<String>
where
    S: Stream<Item = Value>,
{
    tokio::pin!(requests);
    let settle = sleep(settle);
    tokio::pin!(settle);
    loop {
        tokio::select! {
            _ = &mut settle => return Err(WatchError::TokenNotFound),
            headers = requests.next() => match headers {
                Some(headers) => {
                    if let Some(token) = bearer_from_headers(&headers) {
                        debug!("bearer token observed");
                        return Ok(token);
                    }
                }
                None => return Err(WatchError::TokenNotFound),
            },
        }
    }
}

/// Runs one teardown step for at most `limit`. `false` when it failed or hung.
async fn bounded<T, E, F>(step: &str, limit: Duration, fut: F) -> bool
where
    E: Display,
    F: Future<Output = std::result::Result<T, E>>,
{
    match timeout(limit, fut).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            warn!("browser {} failed: {}", step, e);
            false
        }
        Err(_) => {
            warn!("browser {} timed out after {:?}", step, limit);
            false
        }
    }
}

/// Close the browser and reap the process; kill it when either step fails.
async fn release(browser: &mut Browser) {
    let exited = bounded("close", SHUTDOWN_TIMEOUT, browser.close()).await
        && bounded("exit wait", SHUTDOWN_TIMEOUT, browser.wait()).await;
    if exited {
        return;
    }
    match timeout(SHUTDOWN_TIMEOUT, browser.kill()).await {
        Ok(Some(Err(e))) => warn!("browser kill failed: {}", e),
        Ok(_) => debug!("browser process killed"),
        Err(_) => warn!("browser kill timed out after {:?}", SHUTDOWN_TIMEOUT),
    }
}

impl TokenSource for BrowserTokenExtractor {
    async fn acquire_token(&self) -> Result<String> {
        let metrics = get_metrics().await;
        info!(url = %self.search_page_url, "launching browser to harvest a bearer token");

        let (mut browser, mut handler) = Browser::launch(self.browser_config()?).await?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("cdp handler: {}", e);
                }
            }
        });

        let outcome = self.observe(&browser).await;

        // released on every path
        release(&mut browser).await;
        handler_task.abort();

        match &outcome {
            Ok(_) => {
                metrics.token_acquisitions.with_label_values(&["found"]).inc();
                info!("bearer token acquired");
            }
            Err(e) => {
                metrics.token_acquisitions.with_label_values(&["failed"]).inc();
                warn!("token acquisition failed: {}", e);
            }
        }
        outcome
    }
}

/// Credential from an `Authorization: Bearer <token>` header, if present.
/// Header names are matched case-insensitively.
pub fn bearer_from_headers(headers: &Value) -> Option<String> {
    headers
        .as_object()?
        .iter()
        .filter(|(name, _)| name.eq_ignore_ascii_case("authorization"))
        .filter_map(|(_, value)| value.as_str())
        .find_map(|value| BEARER_HEADER.captures(value))
        .map(|caps| caps[1].to_owned())
}
