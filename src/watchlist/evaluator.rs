use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::api::client::ApiClient;
use crate::api::models::ProductRecord;
use crate::cache::token_cache::TokenStore;
use crate::observability::metrics::get_metrics;
use crate::sources::TokenSource;
use crate::watchlist::store::{WatchEntry, Watchlist};

/// A watched product whose promotion met at least one threshold.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Alert {
    pub product_id: String,
    pub friendly_name: String,
    pub store: String,
    pub regular_price: f64,
    pub promo_price: f64,
    pub discount_percent: f64,
    pub price_triggered: bool,
    pub discount_triggered: bool,
}

/// Result of comparing one product against its watch entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    Alert(Alert),
    /// on promotion, thresholds not met
    BelowThreshold,
    NoPromotion,
    MissingRegularPrice,
    MissingRewardValue,
}

pub fn evaluate(product_id: &str, entry: &WatchEntry, product: &ProductRecord) -> Evaluation {
    let regular_cents = match product.regular_price_cents() {
        Some(cents) if cents > 0 => cents,
        _ => return Evaluation::MissingRegularPrice,
    };
    if !product.on_promotion() {
        return Evaluation::NoPromotion;
    }
    let Some(promo_cents) = product.promo_price_cents() else {
        return Evaluation::MissingRewardValue;
    };

    let regular_price = regular_cents as f64 / 100.0;
    let promo_price = promo_cents as f64 / 100.0;
    let discount_percent = (regular_price - promo_price) / regular_price * 100.0;

    let price_triggered = entry.target_price.is_some_and(|target| promo_price <= target);
    let discount_triggered = entry
        .min_discount_percent
        .is_some_and(|min| discount_percent >= min);

    if !(price_triggered || discount_triggered) {
        return Evaluation::BelowThreshold;
    }

    Evaluation::Alert(Alert {
        product_id: product_id.to_owned(),
        friendly_name: entry.friendly_name.to_owned(),
        store: entry.store.to_owned(),
        regular_price,
        promo_price,
        discount_percent,
        price_triggered,
        discount_triggered,
    })
}

#[derive(Debug, Default)]
pub struct CheckReport {
    pub alerts: Vec<Alert>,
    pub checked: usize,
    pub skipped: Vec<(String, String)>,
}

impl CheckReport {
    /// Alerts grouped by store label.
    pub fn alerts_by_store(&self) -> BTreeMap<&str, Vec<Alert>> {
        let mut grouped: BTreeMap<&str, Vec<Alert>> = BTreeMap::new();
        for alert in &self.alerts {
            grouped.entry(alert.store.as_str()).or_default().push(alert.clone());
        }
        grouped
    }
}

/// Evaluate every entry. A failing product is logged and skipped; the rest of
/// the list is still checked.
pub async fn check_watchlist<C: TokenStore, S: TokenSource>(
    client: &mut ApiClient<C, S>,
    watchlist: &Watchlist,
    stores: &BTreeMap<String, String>,
) -> CheckReport {
    let metrics = get_metrics().await;
    let mut report = CheckReport::default();

    // fewer store switches
    let mut entries: Vec<(&String, &WatchEntry)> = watchlist.iter().collect();
    entries.sort_by(|a, b| a.1.store.cmp(&b.1.store).then(a.0.cmp(b.0)));

    for (product_id, entry) in entries {
        let Some(store_id) = stores.get(&entry.store) else {
            warn!(product_id = %product_id, store = %entry.store, "unknown store, skipping {}", entry.friendly_name);
            metrics.products_skipped.inc();
            report.skipped.push((product_id.to_owned(), format!("unknown store '{}'", entry.store)));
            continue;
        };
        if client.store_id() != store_id {
            client.set_store(store_id.as_str());
        }

        let product = match client.get_product_by_id(product_id).await {
            Ok(product) => product,
            Err(e) => {
                warn!(product_id = %product_id, "error fetching product {}: {}", entry.friendly_name, e);
                metrics.products_skipped.inc();
                report.skipped.push((product_id.to_owned(), e.to_string()));
                continue;
            }
        };
        metrics.products_checked.inc();
        report.checked += 1;

        match evaluate(product_id, entry, &product) {
            Evaluation::Alert(alert) => {
                info!(
                    product_id = %product_id,
                    promo_price = alert.promo_price,
                    discount_percent = alert.discount_percent,
                    "alert for {}", entry.friendly_name
                );
                metrics.alerts_raised.inc();
                report.alerts.push(alert);
            }
            Evaluation::BelowThreshold => info!("{} on promotion, thresholds not met", entry.friendly_name),
            Evaluation::NoPromotion => info!("no active promotion for {}", entry.friendly_name),
            Evaluation::MissingRegularPrice => warn!("product {} missing regular price", entry.friendly_name),
            Evaluation::MissingRewardValue => warn!("no promo reward value for {}", entry.friendly_name),
        }
    }

    report
}
