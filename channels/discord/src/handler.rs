use serenity::async_trait;
use serenity::builder::{CreateEmbed, CreateInteractionResponse, CreateInteractionResponseMessage};
use serenity::model::application::{CommandInteraction, Interaction};
use serenity::model::channel::Channel;
use serenity::model::gateway::Ready;
use serenity::model::guild::Guild;
use serenity::model::id::ChannelId;
use serenity::model::permissions::Permissions;
use serenity::model::{Colour, Timestamp};
use serenity::prelude::*;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};

use crate::notify::DiscordNotifier;
use crate::{commands, poller, AppContext};

pub struct Handler {
    app: AppContext,
    loop_armed: AtomicBool,
}

impl Handler {
    pub fn new(app: AppContext) -> Self {
        Self {
            app,
            loop_armed: AtomicBool::new(false),
        }
    }

    fn has_permission(command: &CommandInteraction, required: Permissions) -> bool {
        command
            .member
            .as_ref()
            .and_then(|member| member.permissions)
            .map_or(false, |permissions| permissions.contains(required))
    }

    async fn subscribe(&self, command: &CommandInteraction) -> CreateInteractionResponse {
        if !Self::has_permission(command, Permissions::MANAGE_CHANNELS) {
            return denied("Manage Channels");
        }

        let id = command.channel_id.get();
        match self.app.registry.add(id).await {
            Ok(true) => {
                info!("Channel {} was subscribed.", id);
                message("> \u{2705} This channel is now subscribed to ban notifications.")
            }
            Ok(false) => message("> \u{2139}\u{FE0F} This channel is already subscribed."),
            Err(e) => {
                error!("Failed to persist subscription for {}: {}", id, e);
                message("> \u{274C} Could not save the subscription, please try again.")
            }
        }
    }

    async fn unsubscribe(&self, command: &CommandInteraction) -> CreateInteractionResponse {
        if !Self::has_permission(command, Permissions::MANAGE_CHANNELS) {
            return denied("Manage Channels");
        }

        let id = command.channel_id.get();
        match self.app.registry.remove(id).await {
            Ok(true) => {
                info!("Channel {} was unsubscribed.", id);
                message("> \u{2705} This channel is no longer subscribed.")
            }
            Ok(false) => message("> \u{2139}\u{FE0F} This channel is not subscribed."),
            Err(e) => {
                error!("Failed to persist unsubscription for {}: {}", id, e);
                message("> \u{274C} Could not save the change, please try again.")
            }
        }
    }

    async fn stats(&self) -> CreateInteractionResponse {
        let summary = self.app.tracker.lock().await.summary(chrono::Utc::now());

        let mut embed = CreateEmbed::new()
            .title("\u{1F4CA} Ban Tracker Statistics")
            .colour(Colour::BLUE)
            .timestamp(Timestamp::now())
            .field(
                "\u{2694}\u{FE0F} Watchdog Bans Tracked",
                tracker::group_digits(summary.watchdog_tracked),
                true,
            )
            .field(
                "\u{1F46E} Staff Bans Tracked",
                tracker::group_digits(summary.staff_tracked),
                true,
            )
            .field(
                "\u{1F4C8} Total Tracked",
                tracker::group_digits(summary.total_tracked),
                true,
            )
            .field("\u{23F0} Uptime", format_uptime(summary.uptime), true);

        if let Some(last_fetch) = summary.last_fetch {
            embed = embed.field(
                "\u{1F504} Last Check",
                format!("<t:{}:R>", last_fetch.timestamp()),
                true,
            );
        }
        if let Some(total) = summary.current_total_bans {
            embed = embed.field(
                "\u{1F3AF} Current Total Bans",
                tracker::group_digits(total),
                true,
            );
        }

        CreateInteractionResponse::Message(CreateInteractionResponseMessage::new().embed(embed))
    }

    async fn list_channels(
        &self,
        ctx: &Context,
        command: &CommandInteraction,
    ) -> CreateInteractionResponse {
        if !Self::has_permission(command, Permissions::ADMINISTRATOR) {
            return denied("Administrator");
        }

        let channels = self.app.registry.list().await;
        if channels.is_empty() {
            return message("> \u{2139}\u{FE0F} No channels are currently subscribed.");
        }

        let mut description = String::new();
        for id in channels {
            match ctx.http.get_channel(ChannelId::new(id)).await {
                Ok(Channel::Guild(channel)) => {
                    let _ = writeln!(description, "\u{2022} <#{}> (#{})", id, channel.name);
                }
                Ok(_) => {
                    let _ = writeln!(description, "\u{2022} <#{}>", id);
                }
                Err(_) => {
                    let _ = writeln!(description, "\u{2022} Unknown Channel (ID: {})", id);
                }
            }
        }

        let embed = CreateEmbed::new()
            .title("\u{1F4CB} Subscribed Channels")
            .colour(Colour::DARK_GREEN)
            .description(description);

        CreateInteractionResponse::Message(
            CreateInteractionResponseMessage::new()
                .embed(embed)
                .ephemeral(true),
        )
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);

        // Drop stored channels Discord can no longer resolve.
        let mut resolvable = HashSet::new();
        for id in self.app.registry.list().await {
            if ctx.http.get_channel(ChannelId::new(id)).await.is_ok() {
                resolvable.insert(id);
            }
        }
        match self
            .app
            .registry
            .validate_against(|id| resolvable.contains(&id))
            .await
        {
            Ok(removed) if !removed.is_empty() => {
                warn!("Removed {} invalid channel(s)", removed.len());
            }
            Ok(_) => {}
            Err(e) => error!("Failed to persist channel validation: {}", e),
        }

        let mut synced = 0usize;
        for guild in &ready.guilds {
            match guild.id.set_commands(&ctx.http, commands::all()).await {
                Ok(_) => synced += 1,
                Err(e) => error!("Failed to sync commands with guild {}: {}", guild.id, e),
            }
        }
        let plural = if synced != 1 { "s" } else { "" };
        info!("Synced commands with {} guild{}.", synced, plural);
        info!("Monitoring {} channel(s)", self.app.registry.len().await);

        // ready fires again on reconnect; only arm the loop once
        if !self.loop_armed.swap(true, Ordering::SeqCst) {
            let app = self.app.clone();
            let notifier = DiscordNotifier::new(ctx.http.clone());
            tokio::spawn(async move {
                poller::run(app, notifier).await;
            });
        }
    }

    async fn guild_create(&self, ctx: Context, guild: Guild, is_new: Option<bool>) {
        if is_new != Some(true) {
            return;
        }
        match guild.id.set_commands(&ctx.http, commands::all()).await {
            Ok(_) => info!("Synced commands with {}.", guild.name),
            Err(e) => error!("Failed to sync commands with {}: {}", guild.name, e),
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };

        let response = match command.data.name.as_str() {
            commands::SUBSCRIBE => self.subscribe(&command).await,
            commands::UNSUBSCRIBE => self.unsubscribe(&command).await,
            commands::STATS => self.stats().await,
            commands::LIST_CHANNELS => self.list_channels(&ctx, &command).await,
            other => {
                warn!("Unknown command: {}", other);
                return;
            }
        };

        if let Err(e) = command.create_response(&ctx.http, response).await {
            error!("Error sending interaction response: {:?}", e);
        }
    }
}

fn message(text: impl Into<String>) -> CreateInteractionResponse {
    CreateInteractionResponse::Message(CreateInteractionResponseMessage::new().content(text))
}

fn denied(permission: &str) -> CreateInteractionResponse {
    CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .content(format!(
                "> \u{274C} You need the `{}` permission to use this command.",
                permission
            ))
            .ephemeral(true),
    )
}

/// Renders an uptime duration as H:MM:SS, with a day prefix past 24h.
fn format_uptime(uptime: chrono::Duration) -> String {
    let total = uptime.num_seconds().max(0);
    let (days, rest) = (total / 86_400, total % 86_400);
    let (hours, rest) = (rest / 3_600, rest % 3_600);
    let (minutes, seconds) = (rest / 60, rest % 60);

    if days > 0 {
        format!("{}d {}:{:02}:{:02}", days, hours, minutes, seconds)
    } else {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::format_uptime;
    use chrono::Duration;

    #[test]
    fn uptime_formats_as_clock_time() {
        assert_eq!(format_uptime(Duration::seconds(0)), "0:00:00");
        assert_eq!(format_uptime(Duration::seconds(59)), "0:00:59");
        assert_eq!(format_uptime(Duration::seconds(3_723)), "1:02:03");
        assert_eq!(format_uptime(Duration::seconds(90_000)), "1d 1:00:00");
    }

    #[test]
    fn negative_uptime_clamps_to_zero() {
        assert_eq!(format_uptime(Duration::seconds(-5)), "0:00:00");
    }
}
