//! The daily check: evaluate the whole watchlist, then send one alert email per
//! store that produced alerts.

use tracing::{error, info, warn};

use crate::api::client::ApiClient;
use crate::cache::token_cache::TokenStore;
use crate::config::service::ServiceConfig;
use crate::helpers::time::now_i64;
use crate::notify::email::{send_alerts, Mailer};
use crate::observability::metrics::get_metrics;
use crate::sources::TokenSource;
use crate::watchlist::evaluator::{check_watchlist, CheckReport};
use crate::watchlist::store::Watchlist;

/// Store id the client should start with: the first watched store that is
/// known to the config.
pub fn initial_store_id<'a>(cfg: &'a ServiceConfig, watchlist: &Watchlist) -> Option<&'a str> {
    watchlist.values().find_map(|entry| cfg.store_id(&entry.store).ok())
}

pub async fn run_daily_check<C: TokenStore, S: TokenSource, M: Mailer>(
    client: &mut ApiClient<C, S>,
    cfg: &ServiceConfig,
    watchlist: &Watchlist,
    mailer: Option<&M>,
) -> CheckReport {
    info!(entries = watchlist.len(), "starting daily check");
    let report = check_watchlist(client, watchlist, &cfg.stores).await;
    info!(
        checked = report.checked,
        skipped = report.skipped.len(),
        alerts = report.alerts.len(),
        "daily check finished"
    );

    match (mailer, cfg.email.as_ref()) {
        (Some(mailer), Some(email)) => {
            for (store, alerts) in report.alerts_by_store() {
                if let Err(e) = send_alerts(mailer, &email.subject, &alerts, store).await {
                    error!(store, "failed to send alert email: {}", e);
                }
            }
        }
        _ if !report.alerts.is_empty() => warn!("email not configured, {} alerts not sent", report.alerts.len()),
        _ => {}
    }

    get_metrics().await.last_run_unix.set(now_i64());
    report
}
