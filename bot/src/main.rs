use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::error;

use common::config::ConfigStore;
use common::registry::ChannelRegistry;
use discord::AppContext;
use tracker::fetch::{StatsFetcher, DEFAULT_STATS_URL};
use tracker::BanTracker;

const USER_AGENT: &str = concat!("bantracker/", env!("CARGO_PKG_VERSION"));

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long, default_value = "config.json")]
    config: String,
    /// Seconds between polls of the stats endpoint
    #[arg(long, default_value_t = 30)]
    interval_secs: u64,
    #[arg(long, default_value = DEFAULT_STATS_URL)]
    stats_url: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let config = match ConfigStore::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    let Some(token) = config.token().await else {
        error!("No token configured in {}", args.config);
        std::process::exit(1);
    };

    let client = match reqwest::Client::builder().user_agent(USER_AGENT).build() {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    let registry = ChannelRegistry::hydrate(config.clone()).await;
    let app = AppContext {
        config,
        registry,
        tracker: Arc::new(Mutex::new(BanTracker::new(chrono::Utc::now()))),
        fetcher: StatsFetcher::new(client, args.stats_url),
        poll_interval: Duration::from_secs(args.interval_secs),
    };

    if let Err(e) = discord::start(app, &token).await {
        error!("Discord error: {}", e);
    }
}
