// Shared helpers for the scenario tests.
pub use serde_json::json;

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use httpmock::MockServer;
use tempfile::TempDir;

use crate::api::client::{ApiClient, ClientSettings};
use crate::cache::token_cache::FileTokenCache;
use crate::errors::{Result, WatchError};
use crate::helpers::time::now_u64;
use crate::sources::TokenSource;

pub const SEARCH_PATH: &str = "/search/paginated/products";

/// Unsigned JWT carrying only `exp`.
pub fn sample_jwt(exp: u64) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = URL_SAFE_NO_PAD.encode(json!({ "exp": exp, "sub": "guest" }).to_string());
    format!("{}.{}.sig", header, claims)
}

/// Hands out pre-scripted tokens in order and counts the calls.
#[derive(Clone, Default)]
pub struct ScriptedSource {
    tokens: Arc<Mutex<Vec<String>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new<I: IntoIterator<Item = String>>(tokens: I) -> Self {
        let mut tokens: Vec<String> = tokens.into_iter().collect();
        tokens.reverse();
        Self {
            tokens: Arc::new(Mutex::new(tokens)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TokenSource for ScriptedSource {
    async fn acquire_token(&self) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tokens.lock().unwrap().pop().ok_or(WatchError::TokenNotFound)
    }
}

pub struct Harness {
    pub server: MockServer,
    pub cache_dir: TempDir,
}

impl Harness {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start_async().await,
            cache_dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn cache_path(&self) -> PathBuf {
        self.cache_dir.path().join(".cache").join("token_cache.json")
    }

    pub fn cache(&self) -> FileTokenCache {
        FileTokenCache::new(self.cache_path(), 60)
    }

    pub fn settings(&self) -> ClientSettings {
        ClientSettings {
            base_url: self.server.base_url(),
            safety_margin_seconds: 60,
            fallback_ttl_seconds: 600,
            request_timeout: Some(std::time::Duration::from_secs(5)),
        }
    }

    pub async fn client(&self, store_id: &str, source: ScriptedSource) -> Result<ApiClient<FileTokenCache, ScriptedSource>> {
        ApiClient::new(self.settings(), store_id, self.cache(), source).await
    }
}

pub fn hour_jwt() -> String {
    sample_jwt(now_u64() + 3600)
}

pub fn product_json(id: &str, name: &str, price: i64, reward: Option<i64>) -> serde_json::Value {
    let promotions = match reward {
        Some(r) => json!([{ "rewardValue": r }]),
        None => json!([]),
    };
    json!({
        "productId": id,
        "name": name,
        "displayName": "225ml",
        "brand": "Aveeno",
        "singlePrice": { "price": price },
        "promotions": promotions
    })
}

/// Keeps every message instead of sending it.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl crate::notify::email::Mailer for RecordingMailer {
    async fn send(&self, subject: &str, body: String) -> Result<()> {
        self.sent.lock().unwrap().push((subject.to_owned(), body));
        Ok(())
    }
}
