use serenity::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info};

use common::config::ConfigStore;
use common::registry::ChannelRegistry;
use tracker::fetch::StatsFetcher;
use tracker::BanTracker;

pub mod commands;
pub mod handler;
pub mod notify;
pub mod poller;

/// Everything the command surface and the delivery loop need, passed
/// explicitly instead of living in globals. Cloning is cheap; the tracker
/// is the only piece behind a mutex.
#[derive(Clone)]
pub struct AppContext {
    pub config: ConfigStore,
    pub registry: ChannelRegistry,
    pub tracker: Arc<Mutex<BanTracker>>,
    pub fetcher: StatsFetcher,
    pub poll_interval: Duration,
}

pub async fn start(app: AppContext, token: &str) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting Discord bot...");

    let intents = GatewayIntents::GUILDS;
    let handler = handler::Handler::new(app);

    let mut client = Client::builder(token, intents)
        .event_handler(handler)
        .await?;

    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }

    Ok(())
}
