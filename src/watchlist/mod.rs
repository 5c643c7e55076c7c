pub mod daily;
pub mod evaluator;
pub mod store;

pub use daily::{initial_store_id, run_daily_check};
pub use evaluator::{check_watchlist, evaluate, Alert, CheckReport, Evaluation};
pub use store::{EntryUpdate, WatchEntry, Watchlist, WatchlistStore};
