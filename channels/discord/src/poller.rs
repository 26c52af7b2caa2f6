use crate::notify::Notifier;
use crate::AppContext;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

/// Drives one fetch/observe/broadcast cycle per period, forever. A slow
/// tick delays the next one instead of overlapping it.
pub async fn run(app: AppContext, notifier: impl Notifier) {
    let mut ticker = interval(app.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        tick(&app, &notifier).await;
    }
}

async fn tick(app: &AppContext, notifier: &impl Notifier) {
    let (watchdog, staff) = match app.fetcher.fetch().await {
        Ok(counts) => counts,
        Err(e) => {
            let mut tracker = app.tracker.lock().await;
            tracker.record_failure();
            warn!(
                "Error fetching ban data ({} consecutive): {}",
                tracker.consecutive_errors(),
                e
            );
            return;
        }
    };

    let notifications = app
        .tracker
        .lock()
        .await
        .observe(watchdog, staff, chrono::Utc::now());
    if notifications.is_empty() {
        return;
    }

    let mut failed = Vec::new();
    for channel in app.registry.list().await {
        if let Err(e) = notifier.deliver(channel, &notifications).await {
            warn!("Delivery to channel {} failed: {}", channel, e);
            failed.push(channel);
        }
    }

    if !failed.is_empty() {
        match app.registry.remove_all(&failed).await {
            Ok(removed) => info!("Removed {} failed channel(s)", removed.len()),
            Err(e) => error!("Failed to persist channel removal: {}", e),
        }
    }
}
