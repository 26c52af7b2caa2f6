use crate::config::{ConfigError, ConfigStore};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Insertion-ordered set of subscribed channel ids, backed 1:1 by the
/// config file. Every mutation is persisted before it is visible in
/// memory, so the two never diverge across an await point.
#[derive(Clone)]
pub struct ChannelRegistry {
    store: ConfigStore,
    channels: Arc<RwLock<Vec<u64>>>,
}

impl ChannelRegistry {
    pub async fn hydrate(store: ConfigStore) -> Self {
        let channels = store.channels().await;
        Self {
            store,
            channels: Arc::new(RwLock::new(channels)),
        }
    }

    pub async fn contains(&self, id: u64) -> bool {
        self.channels.read().await.contains(&id)
    }

    /// Snapshot of the current membership, in insertion order.
    pub async fn list(&self) -> Vec<u64> {
        self.channels.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.channels.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.channels.read().await.is_empty()
    }

    /// Subscribes a channel. Returns false if it was already present.
    pub async fn add(&self, id: u64) -> Result<bool, ConfigError> {
        let mut channels = self.channels.write().await;
        if channels.contains(&id) {
            return Ok(false);
        }
        let mut next = channels.clone();
        next.push(id);
        self.store.set_channels(next.clone()).await?;
        *channels = next;
        Ok(true)
    }

    /// Unsubscribes a channel. Returns false if it was not present.
    pub async fn remove(&self, id: u64) -> Result<bool, ConfigError> {
        let mut channels = self.channels.write().await;
        if !channels.contains(&id) {
            return Ok(false);
        }
        let next: Vec<u64> = channels.iter().copied().filter(|c| *c != id).collect();
        self.store.set_channels(next.clone()).await?;
        *channels = next;
        Ok(true)
    }

    /// Removes every listed id in one batch with a single persist.
    /// Returns the ids that were actually removed.
    pub async fn remove_all(&self, ids: &[u64]) -> Result<Vec<u64>, ConfigError> {
        let mut channels = self.channels.write().await;
        let removed: Vec<u64> = channels.iter().copied().filter(|c| ids.contains(c)).collect();
        if removed.is_empty() {
            return Ok(removed);
        }
        let next: Vec<u64> = channels.iter().copied().filter(|c| !ids.contains(c)).collect();
        self.store.set_channels(next.clone()).await?;
        *channels = next;
        Ok(removed)
    }

    /// Startup sweep: drops every id the transport can no longer resolve.
    pub async fn validate_against<F>(&self, resolvable: F) -> Result<Vec<u64>, ConfigError>
    where
        F: Fn(u64) -> bool,
    {
        let stale: Vec<u64> = {
            let channels = self.channels.read().await;
            channels.iter().copied().filter(|c| !resolvable(*c)).collect()
        };
        self.remove_all(&stale).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn registry_at(path: &std::path::Path) -> ChannelRegistry {
        let store = ConfigStore::load(path).unwrap();
        ChannelRegistry::hydrate(store).await
    }

    #[tokio::test]
    async fn add_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let registry = registry_at(&path).await;

        assert!(registry.add(1).await.unwrap());
        assert!(!registry.add(1).await.unwrap());
        assert_eq!(registry.list().await, vec![1]);

        // persisted form matches in-memory form
        assert_eq!(registry_at(&path).await.list().await, vec![1]);
    }

    #[tokio::test]
    async fn remove_of_absent_id_is_a_noop() {
        let dir = TempDir::new().unwrap();
        let registry = registry_at(&dir.path().join("config.json")).await;

        registry.add(1).await.unwrap();
        assert!(!registry.remove(2).await.unwrap());
        assert!(registry.remove(1).await.unwrap());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn list_preserves_insertion_order() {
        let dir = TempDir::new().unwrap();
        let registry = registry_at(&dir.path().join("config.json")).await;

        registry.add(3).await.unwrap();
        registry.add(1).await.unwrap();
        registry.add(2).await.unwrap();
        assert_eq!(registry.list().await, vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn remove_all_prunes_in_one_batch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let registry = registry_at(&path).await;

        for id in [1, 2, 3, 4] {
            registry.add(id).await.unwrap();
        }
        let removed = registry.remove_all(&[2, 4, 9]).await.unwrap();
        assert_eq!(removed, vec![2, 4]);
        assert_eq!(registry.list().await, vec![1, 3]);
        assert_eq!(registry_at(&path).await.list().await, vec![1, 3]);
    }

    #[tokio::test]
    async fn validate_drops_unresolvable_ids() {
        let dir = TempDir::new().unwrap();
        let registry = registry_at(&dir.path().join("config.json")).await;

        for id in [1, 2, 3] {
            registry.add(id).await.unwrap();
        }
        let removed = registry.validate_against(|id| id != 2).await.unwrap();
        assert_eq!(removed, vec![2]);
        assert_eq!(registry.list().await, vec![1, 3]);
    }

    #[tokio::test]
    async fn failed_persist_leaves_memory_unchanged() {
        let dir = TempDir::new().unwrap();
        // parent directory never exists, so every write fails
        let path = dir.path().join("missing").join("config.json");
        let registry = registry_at(&path).await;

        assert!(registry.add(7).await.is_err());
        assert!(!registry.contains(7).await);
        assert!(registry.is_empty().await);
    }
}
