use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-key mutual exclusion shared by every resource that edits the same
/// remote object. Clones share the same table.
///
/// Entries are never evicted: the table grows with the set of distinct keys
/// ever locked, and a released key keeps its slot for reuse.
#[derive(Debug, Clone, Default)]
pub struct LockTable {
    entries: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

/// Held for as long as the named lock is owned; dropping it releases the key.
#[derive(Debug)]
pub struct NamedLockGuard {
    key: String,
    _guard: OwnedMutexGuard<()>,
}

impl NamedLockGuard {
    pub fn key(&self) -> &str { &self.key }
}

impl Drop for NamedLockGuard {
    fn drop(&mut self) {
        tracing::debug!(key = %self.key, "released named lock");
    }
}

impl LockTable {
    pub fn new() -> Self { Self::default() }

    /// Number of distinct keys locked so far.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    fn entry(&self, key: &str) -> Arc<AsyncMutex<()>> {
        // a poisoned table only means another holder panicked mid-insert
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.entry(key.to_string()).or_default().clone()
    }

    /// Waits until the lock for `name` within `kind` is free and takes it.
    pub async fn lock(&self, name: &str, kind: &str) -> NamedLockGuard {
        let key = format!("{kind}.{name}");
        tracing::debug!(key = %key, "acquiring named lock");
        let guard = self.entry(&key).lock_owned().await;
        tracing::debug!(key = %key, "acquired named lock");
        NamedLockGuard { key, _guard: guard }
    }

    /// Non-blocking variant; `None` when someone else holds the key.
    pub fn try_lock(&self, name: &str, kind: &str) -> Option<NamedLockGuard> {
        let key = format!("{kind}.{name}");
        let guard = self.entry(&key).try_lock_owned().ok()?;
        Some(NamedLockGuard { key, _guard: guard })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_is_exclusive() {
        let locks = LockTable::new();
        let g = locks.lock("wf1", "azurerm_logic_app").await;
        assert_eq!(g.key(), "azurerm_logic_app.wf1");
        assert!(locks.try_lock("wf1", "azurerm_logic_app").is_none());
        drop(g);
        assert!(locks.try_lock("wf1", "azurerm_logic_app").is_some());
    }

    #[tokio::test]
    async fn different_keys_do_not_contend() {
        let locks = LockTable::new();
        let _a = locks.lock("wf1", "azurerm_logic_app").await;
        assert!(locks.try_lock("wf2", "azurerm_logic_app").is_some());
        assert!(locks.try_lock("wf1", "other_kind").is_some());
    }

    #[tokio::test]
    async fn released_keys_keep_their_slot() {
        let locks = LockTable::new();
        assert!(locks.is_empty());
        drop(locks.lock("wf1", "k").await);
        drop(locks.lock("wf1", "k").await);
        drop(locks.lock("wf2", "k").await);
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn clones_share_state() {
        let locks = LockTable::new();
        let other = locks.clone();
        let g = locks.lock("wf1", "k").await;

        let waiter = tokio::spawn(async move {
            let _g = other.lock("wf1", "k").await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        drop(g);
        tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
    }
}
