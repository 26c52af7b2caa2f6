use serenity::builder::CreateCommand;

pub const SUBSCRIBE: &str = "subscribe";
pub const UNSUBSCRIBE: &str = "unsubscribe";
pub const STATS: &str = "stats";
pub const LIST_CHANNELS: &str = "list_channels";

/// The full command set, registered per guild.
pub fn all() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new(SUBSCRIBE)
            .description("Subscribes the channel to receive ban notifications"),
        CreateCommand::new(UNSUBSCRIBE)
            .description("Unsubscribes the channel from receiving ban notifications"),
        CreateCommand::new(STATS).description("Shows statistics about the ban tracker"),
        CreateCommand::new(LIST_CHANNELS).description("Lists all subscribed channels (Admin only)"),
    ]
}
