use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// On-disk configuration. The token is read-only from the bot's point of
/// view; the channel list is rewritten whenever a subscription changes.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BotConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default)]
    pub channels: Vec<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct ConfigStore {
    path: Arc<PathBuf>,
    config: Arc<RwLock<BotConfig>>,
}

impl ConfigStore {
    /// Loads the config file, or starts from defaults if it does not exist.
    /// A file that exists but fails to parse is an error, not a default.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let config = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            tracing::warn!("Config file {:?} not found, starting with defaults", path);
            BotConfig::default()
        };

        Ok(Self {
            path: Arc::new(path),
            config: Arc::new(RwLock::new(config)),
        })
    }

    pub async fn token(&self) -> Option<String> {
        self.config.read().await.token.clone()
    }

    pub async fn channels(&self) -> Vec<u64> {
        self.config.read().await.channels.clone()
    }

    /// Replaces the channel list. The file is rewritten first; the in-memory
    /// copy only changes once the write has landed, so a failed persist
    /// leaves both sides on the old list.
    pub async fn set_channels(&self, channels: Vec<u64>) -> Result<(), ConfigError> {
        let mut config = self.config.write().await;
        let next = BotConfig {
            token: config.token.clone(),
            channels,
        };
        self.write_to_disk(&next)?;
        *config = next;
        Ok(())
    }

    fn write_to_disk(&self, config: &BotConfig) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(config)?;

        // Write to temp file then rename
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, content)?;
        fs::rename(&tmp_path, &*self.path)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::load(dir.path().join("config.json")).unwrap();
        assert_eq!(store.token().await, None);
        assert!(store.channels().await.is_empty());
    }

    #[tokio::test]
    async fn channels_round_trip_through_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let store = ConfigStore::load(&path).unwrap();
        store.set_channels(vec![5, 6]).await.unwrap();

        let reloaded = ConfigStore::load(&path).unwrap();
        assert_eq!(reloaded.channels().await, vec![5, 6]);
        assert_eq!(reloaded.token().await, None);
    }

    #[tokio::test]
    async fn token_survives_channel_updates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"token":"abc","channels":[1]}"#).unwrap();

        let store = ConfigStore::load(&path).unwrap();
        store.set_channels(vec![1, 2]).await.unwrap();

        let reloaded = ConfigStore::load(&path).unwrap();
        assert_eq!(reloaded.token().await, Some("abc".to_string()));
        assert_eq!(reloaded.channels().await, vec![1, 2]);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();

        match ConfigStore::load(&path) {
            Err(ConfigError::Parse(_)) => {}
            other => panic!("expected parse error, got {:?}", other.err()),
        }
    }
}
