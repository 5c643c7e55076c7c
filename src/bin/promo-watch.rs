use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use promo_watch::api::{ApiClient, ClientSettings, ProductRecord, SearchQuery};
use promo_watch::cache::token_cache::{FileTokenCache, TokenStore};
use promo_watch::config::service::ServiceConfig;
use promo_watch::helpers::time::{get_token_safety_margin_seconds, now_u64};
use promo_watch::notify::SmtpMailer;
use promo_watch::observability::metrics::get_metrics;
use promo_watch::sources::browser::BrowserTokenExtractor;
use promo_watch::utils::config_loader;
use promo_watch::utils::logging::{self, LogLevel};
use promo_watch::watchlist::{initial_store_id, run_daily_check, EntryUpdate, WatchEntry, WatchlistStore};
use tracing::{info, warn};

type Client = ApiClient<FileTokenCache, BrowserTokenExtractor>;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "promo-watch.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check the watchlist and email alerts
    Check,
    /// Search the catalog of one store
    Search {
        query: String,
        #[arg(long)]
        store: String,
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long)]
        hits: Option<u32>,
    },
    /// Manage watched products
    #[command(subcommand)]
    Watch(WatchCommand),
    /// Inspect or drop the cached token
    #[command(subcommand)]
    Token(TokenCommand),
}

#[derive(Subcommand)]
enum WatchCommand {
    Add {
        product_id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        store: String,
        #[command(flatten)]
        thresholds: Thresholds,
    },
    Remove {
        product_id: String,
    },
    List,
    Update {
        product_id: String,
        #[command(flatten)]
        thresholds: Thresholds,
    },
}

#[derive(ClapArgs)]
struct Thresholds {
    #[arg(long)]
    target_price: Option<f64>,
    #[arg(long)]
    min_discount: Option<f64>,
}

#[derive(Subcommand)]
enum TokenCommand {
    Show,
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Read args, load YAML config
    // -------------------------------

    let args = Args::parse();
    let service_config = config_loader::run(&args.config).await?;

    // -------------------------------
    // 2. Logging
    // -------------------------------

    logging::run(&service_config, args.log_level);

    // -------------------------------
    // 3. Dispatch
    // -------------------------------

    match args.command {
        Command::Check => check(&service_config).await,
        Command::Search { query, store, page, hits } => search(&service_config, query, &store, page, hits).await,
        Command::Watch(cmd) => watch(&service_config, cmd),
        Command::Token(cmd) => token(&service_config, cmd).await,
    }
}

fn token_cache(cfg: &ServiceConfig) -> FileTokenCache {
    let margin = get_token_safety_margin_seconds(cfg.settings.safety_margin_seconds);
    FileTokenCache::new(&cfg.settings.token_cache_path, margin)
}

async fn build_client(cfg: &ServiceConfig, store_id: &str) -> Result<Client> {
    let client = ApiClient::new(
        ClientSettings::from_config(cfg),
        store_id,
        token_cache(cfg),
        BrowserTokenExtractor::new(&cfg.browser),
    )
    .await
    .context("cannot obtain an api token")?;
    Ok(client)
}

async fn check(cfg: &ServiceConfig) -> Result<()> {
    let watchlist = WatchlistStore::new(&cfg.watchlist.path).load()?;
    let Some(store_id) = initial_store_id(cfg, &watchlist) else {
        warn!(entries = watchlist.len(), "nothing to check, watchlist empty or no known stores");
        return Ok(());
    };

    let mut client = build_client(cfg, store_id).await?;
    let mailer = cfg.email.as_ref().map(SmtpMailer::from_config).transpose()?;
    let report = run_daily_check(&mut client, cfg, &watchlist, mailer.as_ref()).await;

    for (product_id, reason) in &report.skipped {
        println!("skipped {}: {}", product_id, reason);
    }
    for alert in &report.alerts {
        println!(
            "{} ({}): now ${:.2}, was ${:.2}, {:.1}% off",
            alert.friendly_name, alert.store, alert.promo_price, alert.regular_price, alert.discount_percent
        );
    }

    // -------------------------------
    // 4. Export metrics for the textfile collector
    // -------------------------------

    let metrics_cfg = &cfg.settings.metrics;
    if let (true, Some(path)) = (metrics_cfg.is_enabled, metrics_cfg.textfile_path.as_ref()) {
        if let Err(e) = get_metrics().await.write_textfile(Path::new(path)).await {
            warn!("cannot write metrics textfile: {}", e);
        }
    }
    Ok(())
}

async fn search(cfg: &ServiceConfig, text: String, store: &str, page: u32, hits: Option<u32>) -> Result<()> {
    let store_id = cfg.store_id(store)?;
    let mut client = build_client(cfg, store_id).await?;

    let mut query = SearchQuery::new(text).page(page);
    if let Some(hits) = hits {
        query = query.hits_per_page(hits);
    }
    let result = client.search_products(&query).await?;

    println!("{:<20} {:<40} {:<12} {:>9} {:>9}", "BRAND", "NAME", "SIZE", "PRICE", "PROMO");
    for product in &result.products {
        print_product(product);
    }
    if let Some(total) = result.total_products {
        println!("{} of {} products", result.products.len(), total);
    }
    Ok(())
}

fn print_product(product: &ProductRecord) {
    let price = |p: Option<f64>| p.map(|v| format!("${:.2}", v)).unwrap_or_else(|| "-".to_owned());
    println!(
        "{:<20} {:<40} {:<12} {:>9} {:>9}",
        product.brand_or_unknown(),
        product.name,
        product.display_name,
        price(product.regular_price()),
        price(product.promo_price())
    );
}

fn watch(cfg: &ServiceConfig, cmd: WatchCommand) -> Result<()> {
    let store = WatchlistStore::new(&cfg.watchlist.path);
    match cmd {
        WatchCommand::Add { product_id, name, store: store_name, thresholds } => {
            cfg.store_id(&store_name)?;
            store.add(
                &product_id,
                WatchEntry {
                    friendly_name: name,
                    store: store_name,
                    target_price: thresholds.target_price,
                    min_discount_percent: thresholds.min_discount,
                },
            )?;
            println!("added {}", product_id);
        }
        WatchCommand::Remove { product_id } => {
            if !store.remove(&product_id)? {
                bail!("product id {} not in watchlist", product_id);
            }
            println!("removed {}", product_id);
        }
        WatchCommand::List => {
            for (product_id, entry) in store.list()? {
                let fmt = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_else(|| "-".to_owned());
                println!(
                    "{:<20} {:<32} {:<16} target={} min_discount={}",
                    product_id,
                    entry.friendly_name,
                    entry.store,
                    fmt(entry.target_price),
                    fmt(entry.min_discount_percent)
                );
            }
        }
        WatchCommand::Update { product_id, thresholds } => {
            let mut updates = Vec::new();
            if let Some(v) = thresholds.target_price {
                updates.push(EntryUpdate::TargetPrice(Some(v)));
            }
            if let Some(v) = thresholds.min_discount {
                updates.push(EntryUpdate::MinDiscountPercent(Some(v)));
            }
            if updates.is_empty() {
                bail!("nothing to update, pass --target-price and/or --min-discount");
            }
            for update in updates {
                if !store.update(&product_id, update)? {
                    bail!("product id {} not in watchlist", product_id);
                }
            }
            println!("updated {}", product_id);
        }
    }
    Ok(())
}

async fn token(cfg: &ServiceConfig, cmd: TokenCommand) -> Result<()> {
    match cmd {
        TokenCommand::Show => {
            let store_id = cfg.stores.values().next().map(String::as_str).unwrap_or_default();
            let client = build_client(cfg, store_id).await?;
            let token = client.token().context("client holds no token")?;
            let prefix: String = token.value.chars().take(16).collect();
            println!(
                "token {}... expires at {} ({}s left)",
                prefix,
                token.exp_unix_ts,
                token.exp_unix_ts as i64 - now_u64() as i64
            );
        }
        TokenCommand::Clear => {
            token_cache(cfg).clear().await;
            info!("token cache cleared");
            println!("token cache cleared");
        }
    }
    Ok(())
}
