use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::cache::token::BearerToken;
use crate::helpers::time::now_u64;

pub const TOKEN_CACHE_PATH_DEFAULT: &str = ".cache/token_cache.json";

/// Persistent home of the last acquired token.
///
/// Best effort: failures never leave the store, a broken record reads as a miss.
pub trait TokenStore {
    /// Token if still usable with the safety margin applied, otherwise `None`.
    fn load(&self) -> impl Future<Output = Option<BearerToken>> + Send;
    /// Unconditional overwrite.
    fn save(&self, token: &BearerToken) -> impl Future<Output = ()> + Send;
    /// Remove the record; no-op when absent.
    fn clear(&self) -> impl Future<Output = ()> + Send;
}

/// On-disk record: `{ "token": string, "expires_at": integer }`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CachedTokenRecord {
    pub token: String,
    pub expires_at: u64,
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("no cached token")]
    Absent,
    #[error("cache unreadable: {0}")]
    Unreadable(#[from] std::io::Error),
    #[error("cache corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("cached token expires at {expires_at}, inside the {margin}s safety margin")]
    Expiring { expires_at: u64, margin: u64 },
}

/// JSON file backed token cache.
#[derive(Debug, Clone)]
pub struct FileTokenCache {
    path: PathBuf,
    safety_margin_seconds: u64,
}

impl FileTokenCache {
    pub fn new(path: impl Into<PathBuf>, safety_margin_seconds: u64) -> Self {
        Self {
            path: path.into(),
            safety_margin_seconds,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw record, no validity check.
    pub async fn read_record(&self) -> Result<CachedTokenRecord, CacheError> {
        let content = fs::read_to_string(&self.path).await.map_err(|err| match err.kind() {
            ErrorKind::NotFound => CacheError::Absent,
            _ => CacheError::Unreadable(err),
        })?;
        Ok(serde_json::from_str::<CachedTokenRecord>(&content)?)
    }

    /// Record filtered through the safety margin at `now_unix_ts`.
    pub async fn read_valid_at(&self, now_unix_ts: u64) -> Result<BearerToken, CacheError> {
        let record = self.read_record().await?;
        let token = BearerToken::new(record.token, record.expires_at);
        if token.is_usable_at(now_unix_ts, self.safety_margin_seconds) {
            Ok(token)
        } else {
            Err(CacheError::Expiring {
                expires_at: record.expires_at,
                margin: self.safety_margin_seconds,
            })
        }
    }

    pub async fn load_at(&self, now_unix_ts: u64) -> Option<BearerToken> {
        match self.read_valid_at(now_unix_ts).await {
            Ok(token) => {
                debug!(expires_at = token.exp_unix_ts, "token cache hit");
                Some(token)
            }
            Err(err @ (CacheError::Absent | CacheError::Expiring { .. })) => {
                debug!("token cache miss: {}", err);
                None
            }
            Err(err) => {
                warn!(path = %self.path.display(), "token cache ignored: {}", err);
                None
            }
        }
    }

    /// Written to an owner-only sibling file, then renamed over the record.
    async fn write_record(&self, record: &CachedTokenRecord) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_vec(record)?;
        let tmp = self.path.with_extension("json.tmp");

        // a leftover tmp file would keep its old mode
        match fs::remove_file(&tmp).await {
            Err(e) if e.kind() != ErrorKind::NotFound => return Err(e),
            _ => {}
        }

        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&tmp).await?;
        file.write_all(&content).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&tmp, &self.path).await
    }
}

impl TokenStore for FileTokenCache {
    async fn load(&self) -> Option<BearerToken> {
        self.load_at(now_u64()).await
    }

    async fn save(&self, token: &BearerToken) {
        let record = CachedTokenRecord {
            token: token.value.to_owned(),
            expires_at: token.exp_unix_ts,
        };
        match self.write_record(&record).await {
            Ok(_) => info!(path = %self.path.display(), expires_at = token.exp_unix_ts, "token cached"),
            Err(err) => warn!(path = %self.path.display(), "token cache write failed: {}", err),
        }
    }

    async fn clear(&self) {
        match fs::remove_file(&self.path).await {
            Ok(_) => info!(path = %self.path.display(), "token cache cleared"),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("token cache already empty: {}", self.path.display());
            }
            Err(e) => warn!(path = %self.path.display(), "token cache clear failed: {}", e),
        }
    }
}
