use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::WatchlistError;

/// One tracked product, keyed by product id in the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WatchEntry {
    pub friendly_name: String,
    /// store name, resolved to an id through `stores` in the config
    pub store: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_discount_percent: Option<f64>,
}

/// Field selector for in-place updates.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryUpdate {
    FriendlyName(String),
    Store(String),
    TargetPrice(Option<f64>),
    MinDiscountPercent(Option<f64>),
}

pub type Watchlist = BTreeMap<String, WatchEntry>;

/// JSON document `{ "<product_id>": { ...entry } }`.
#[derive(Debug, Clone)]
pub struct WatchlistStore {
    path: PathBuf,
}

impl WatchlistStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Absent file reads as an empty watchlist.
    pub fn load(&self) -> Result<Watchlist, WatchlistError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no watchlist yet");
                Ok(Watchlist::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, watchlist: &Watchlist) -> Result<(), WatchlistError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        // serde_json keeps non-ASCII names as-is
        fs::write(&self.path, serde_json::to_string_pretty(watchlist)?)?;
        Ok(())
    }

    pub fn add(&self, product_id: &str, entry: WatchEntry) -> Result<(), WatchlistError> {
        let mut watchlist = self.load()?;
        if watchlist.contains_key(product_id) {
            return Err(WatchlistError::AlreadyExists(product_id.to_owned()));
        }
        info!(product_id, name = %entry.friendly_name, "added to watchlist");
        watchlist.insert(product_id.to_owned(), entry);
        self.save(&watchlist)
    }

    pub fn remove(&self, product_id: &str) -> Result<bool, WatchlistError> {
        let mut watchlist = self.load()?;
        if watchlist.remove(product_id).is_none() {
            return Ok(false);
        }
        self.save(&watchlist)?;
        info!(product_id, "removed from watchlist");
        Ok(true)
    }

    pub fn update(&self, product_id: &str, update: EntryUpdate) -> Result<bool, WatchlistError> {
        let mut watchlist = self.load()?;
        let Some(entry) = watchlist.get_mut(product_id) else {
            return Ok(false);
        };
        match update {
            EntryUpdate::FriendlyName(v) => entry.friendly_name = v,
            EntryUpdate::Store(v) => entry.store = v,
            EntryUpdate::TargetPrice(v) => entry.target_price = v,
            EntryUpdate::MinDiscountPercent(v) => entry.min_discount_percent = v,
        }
        self.save(&watchlist)?;
        Ok(true)
    }

    pub fn list(&self) -> Result<Vec<(String, WatchEntry)>, WatchlistError> {
        Ok(self.load()?.into_iter().collect())
    }

    pub fn get(&self, product_id: &str) -> Result<Option<WatchEntry>, WatchlistError> {
        Ok(self.load()?.remove(product_id))
    }
}
