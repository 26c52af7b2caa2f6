use async_trait::async_trait;
use serenity::http::{Http, HttpError};
use serenity::model::id::ChannelId;
use std::sync::Arc;
use tracker::Notification;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("channel does not resolve")]
    NotFound,
    #[error("missing permission to send")]
    Forbidden,
    #[error("transport error: {0}")]
    Transport(String),
}

/// Seam between the delivery loop and the transport, so the loop can be
/// exercised without a live Discord connection.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers every notification, in order, to one destination.
    async fn deliver(
        &self,
        channel: u64,
        notifications: &[Notification],
    ) -> Result<(), DeliveryError>;
}

pub struct DiscordNotifier {
    http: Arc<Http>,
}

impl DiscordNotifier {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn deliver(
        &self,
        channel: u64,
        notifications: &[Notification],
    ) -> Result<(), DeliveryError> {
        let channel_id = ChannelId::new(channel);
        for notification in notifications {
            channel_id
                .say(&self.http, notification.to_string())
                .await
                .map_err(classify)?;
        }
        Ok(())
    }
}

fn classify(err: serenity::Error) -> DeliveryError {
    if let serenity::Error::Http(HttpError::UnsuccessfulRequest(ref response)) = err {
        return match response.status_code.as_u16() {
            403 => DeliveryError::Forbidden,
            404 => DeliveryError::NotFound,
            _ => DeliveryError::Transport(err.to_string()),
        };
    }
    DeliveryError::Transport(err.to_string())
}
