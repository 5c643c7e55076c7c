//! Authenticated client for the product search API.
//!
//! Owns one bearer token and re-checks it before every request: a token inside
//! the safety margin is replaced (cache first, then the token source) before the
//! request goes out.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use crate::api::models::{ProductRecord, ProductSearchResult};
use crate::api::query::SearchQuery;
use crate::cache::token::BearerToken;
use crate::cache::token_cache::TokenStore;
use crate::cache::token_context::{token_state, TokenContext, TokenState};
use crate::config::service::ServiceConfig;
use crate::errors::{Result, WatchError};
use crate::helpers::time::{get_fallback_ttl_seconds, get_token_safety_margin_seconds, now_u64};
use crate::observability::metrics::get_metrics;
use crate::parser::jwt::expiry_or_fallback;
use crate::sources::TokenSource;

const SEARCH_PATH: &str = "/search/paginated/products";
static SEARCH_OP: &str = "search";
static LOOKUP_OP: &str = "product_by_id";

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub safety_margin_seconds: u64,
    pub fallback_ttl_seconds: u64,
    pub request_timeout: Option<Duration>,
}

impl ClientSettings {
    pub fn from_config(cfg: &ServiceConfig) -> Self {
        Self {
            base_url: cfg.api.base_url.to_owned(),
            safety_margin_seconds: get_token_safety_margin_seconds(cfg.settings.safety_margin_seconds),
            fallback_ttl_seconds: get_fallback_ttl_seconds(cfg.settings.fallback_ttl_seconds),
            request_timeout: cfg.settings.request_timeout_ms.map(Duration::from_millis),
        }
    }
}

pub struct ApiClient<C: TokenStore, S: TokenSource> {
    http: Client,
    search_url: String,
    store_id: String,
    cache: C,
    source: S,
    held: Option<TokenContext>,
    safety_margin_seconds: u64,
    fallback_ttl_seconds: u64,
}

impl<C: TokenStore, S: TokenSource> ApiClient<C, S> {
    /// Build the client and make sure it holds a usable token.
    pub async fn new(settings: ClientSettings, store_id: impl Into<String>, cache: C, source: S) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(t) = settings.request_timeout {
            builder = builder.timeout(t);
        }

        let mut client = Self {
            http: builder.build()?,
            search_url: format!("{}{}", settings.base_url.trim_end_matches('/'), SEARCH_PATH),
            store_id: store_id.into(),
            cache,
            source,
            held: None,
            safety_margin_seconds: settings.safety_margin_seconds,
            fallback_ttl_seconds: settings.fallback_ttl_seconds,
        };
        client.obtain_token().await?;
        Ok(client)
    }

    pub fn state(&self) -> TokenState {
        token_state(self.held.as_ref(), now_u64())
    }

    pub fn token(&self) -> Option<&BearerToken> {
        self.held.as_ref().map(|ctx| &ctx.token)
    }

    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    /// Switch catalog; the token is kept.
    pub fn set_store(&mut self, store_id: impl Into<String>) {
        self.store_id = store_id.into();
        debug!(store_id = %self.store_id, "store context changed");
    }

    /// Forget the held token and the persisted one.
    pub async fn invalidate(&mut self) {
        self.held = None;
        self.cache.clear().await;
    }

    /// Cache first; on a miss ask the source and persist what it returns.
    async fn obtain_token(&mut self) -> Result<()> {
        let metrics = get_metrics().await;

        let token = match self.cache.load().await {
            Some(token) => {
                metrics.token_cache_lookups.with_label_values(&["hit"]).inc();
                info!(expires_at = token.exp_unix_ts, "using cached token");
                token
            }
            None => {
                metrics.token_cache_lookups.with_label_values(&["miss"]).inc();
                info!("no valid cached token, fetching a new one");
                let raw = self.source.acquire_token().await?;
                let exp = expiry_or_fallback(&raw, now_u64(), self.fallback_ttl_seconds);
                let token = BearerToken::new(raw, exp);
                if !token.is_usable_at(now_u64(), self.safety_margin_seconds) {
                    warn!(expires_at = exp, "fresh token already inside the safety margin, using it for this call");
                }
                self.cache.save(&token).await;
                token
            }
        };

        metrics.token_expiry_unix.set(token.exp_unix_ts as i64);
        self.held = Some(TokenContext::new(token, self.safety_margin_seconds));
        Ok(())
    }

    /// Per-call validity check.
    async fn ensure_token(&mut self) -> Result<String> {
        match self.state() {
            TokenState::TokenValid => {}
            state => {
                info!(?state, "token not usable, refreshing before request");
                self.held = None;
                self.obtain_token().await?;
            }
        }
        self.held
            .as_ref()
            .map(|ctx| ctx.token.value.to_owned())
            .ok_or(WatchError::TokenNotFound)
    }

    async fn post_search(&mut self, query: &SearchQuery, operation: &str) -> Result<ProductSearchResult> {
        let metrics = get_metrics().await;
        let token = self.ensure_token().await?;
        let body = query.to_body(&self.store_id);

        metrics.api_requests.with_label_values(&[operation]).inc();
        let timer = metrics.api_duration.with_label_values(&[operation]).start_timer();
        debug!(url = %self.search_url, query = %query.text, page = query.page, "search POST");

        let response = self
            .http
            .post(&self.search_url)
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .inspect_err(|_| metrics.api_failures.with_label_values(&[operation, "transport"]).inc())?;

        let status = response.status();
        if !status.is_success() {
            timer.observe_duration();
            metrics.api_failures.with_label_values(&[operation, status.as_str()]).inc();
            let body = response.text().await.unwrap_or_default();
            if status == StatusCode::UNAUTHORIZED {
                warn!("401 Unauthorized, dropping token so the next call re-acquires");
                self.invalidate().await;
            }
            return Err(WatchError::RequestFailed { status, body });
        }

        let result = response
            .json::<ProductSearchResult>()
            .await
            .inspect_err(|_| metrics.api_failures.with_label_values(&[operation, "decode"]).inc())?;
        timer.observe_duration();
        debug!(products = result.products.len(), "search response");
        Ok(result)
    }

    pub async fn search_products(&mut self, query: &SearchQuery) -> Result<ProductSearchResult> {
        self.post_search(query, SEARCH_OP).await
    }

    /// Exact-id lookup in the current store.
    pub async fn get_product_by_id(&mut self, product_id: &str) -> Result<ProductRecord> {
        let query = SearchQuery::by_product_id(product_id, &self.store_id);
        self.post_search(&query, LOOKUP_OP)
            .await?
            .products
            .into_iter()
            .find(|p| p.product_id == product_id)
            .ok_or_else(|| WatchError::ProductNotFound(product_id.to_owned()))
    }
}
