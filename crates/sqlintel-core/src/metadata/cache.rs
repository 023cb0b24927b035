//! Metadata cache: the current snapshot plus version notifications

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use super::snapshot::{ConnectionKey, MetadataSnapshot, SchemaDraft};
use crate::error::IntelError;

/// Source of schema snapshots for analysis.
///
/// `current` never blocks on a refresh: it hands out whatever snapshot is
/// installed, even a stale one. Refreshes happen elsewhere and announce the
/// new version on the `subscribe` channel.
pub trait MetadataCache: Send + Sync {
    fn current(&self) -> Arc<MetadataSnapshot>;

    /// Receives the version of every newly installed snapshot
    fn subscribe(&self) -> broadcast::Receiver<u64>;

    /// True if `snapshot` is older than the cache is willing to vouch for
    fn is_expired(&self, _snapshot: &MetadataSnapshot) -> bool {
        false
    }
}

struct CacheState {
    snapshots: HashMap<ConnectionKey, Arc<MetadataSnapshot>>,
    active: Option<ConnectionKey>,
    current: Arc<MetadataSnapshot>,
}

/// In-process `MetadataCache` holding one snapshot per connection.
///
/// Writers build a `SchemaDraft` and `publish` it; the cache assigns the
/// next version and swaps the `Arc`. Readers only ever clone the `Arc`.
pub struct SharedMetadataCache {
    state: RwLock<CacheState>,
    next_version: AtomicU64,
    events: broadcast::Sender<u64>,
    ttl: Option<Duration>,
}

impl SharedMetadataCache {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            state: RwLock::new(CacheState {
                snapshots: HashMap::new(),
                active: None,
                current: Arc::new(MetadataSnapshot::empty(ConnectionKey::default())),
            }),
            next_version: AtomicU64::new(1),
            events,
            ttl: None,
        }
    }

    /// Snapshots older than `ttl` are reported as expired
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Install a new snapshot for `key` and return its version. The first
    /// connection published becomes the active one.
    pub fn publish(&self, key: ConnectionKey, draft: SchemaDraft) -> u64 {
        let version = self.next_version.fetch_add(1, Ordering::SeqCst);
        let snapshot = Arc::new(MetadataSnapshot::from_draft(key.clone(), version, draft));
        let announce = {
            let mut state = self.state.write();
            state.snapshots.insert(key.clone(), Arc::clone(&snapshot));
            if state.active.is_none() {
                state.active = Some(key.clone());
            }
            let is_active = state.active.as_ref() == Some(&key);
            if is_active {
                state.current = snapshot;
            }
            is_active
        };
        tracing::debug!(connection = %key, version, active = announce, "metadata snapshot published");
        if announce {
            // no receivers is fine
            let _ = self.events.send(version);
        }
        version
    }

    /// Make `key` the active connection
    pub fn activate(&self, key: &ConnectionKey) -> Result<u64, IntelError> {
        let version = {
            let mut state = self.state.write();
            let snapshot = state
                .snapshots
                .get(key)
                .cloned()
                .ok_or_else(|| IntelError::UnknownConnection(key.to_string()))?;
            state.active = Some(key.clone());
            let version = snapshot.version;
            state.current = snapshot;
            version
        };
        let _ = self.events.send(version);
        Ok(version)
    }

    /// Drop the snapshot for `key`. If it was active the cache falls back to
    /// an empty snapshot under a fresh version, which is announced.
    pub fn forget(&self, key: &ConnectionKey) {
        let announce = {
            let mut state = self.state.write();
            state.snapshots.remove(key);
            if state.active.as_ref() != Some(key) {
                None
            } else {
                let version = self.next_version.fetch_add(1, Ordering::SeqCst);
                let draft = SchemaDraft::new(state.current.default_schema.clone());
                state.active = None;
                state.current = Arc::new(MetadataSnapshot::from_draft(key.clone(), version, draft));
                Some(version)
            }
        };
        if let Some(version) = announce {
            tracing::debug!(connection = %key, version, "active connection forgotten");
            let _ = self.events.send(version);
        }
    }

    pub fn active(&self) -> Option<ConnectionKey> {
        self.state.read().active.clone()
    }
}

impl Default for SharedMetadataCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataCache for SharedMetadataCache {
    fn current(&self) -> Arc<MetadataSnapshot> {
        Arc::clone(&self.state.read().current)
    }

    fn subscribe(&self) -> broadcast::Receiver<u64> {
        self.events.subscribe()
    }

    fn is_expired(&self, snapshot: &MetadataSnapshot) -> bool {
        match self.ttl {
            Some(ttl) => snapshot.version > 0 && snapshot.age() > ttl,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{TableKind, TableMeta};

    fn draft(table: &str) -> SchemaDraft {
        let mut draft = SchemaDraft::new("public");
        draft.add_table(None, TableMeta::new(table, TableKind::Table));
        draft
    }

    #[test]
    fn test_versions_strictly_increase() {
        let cache = SharedMetadataCache::new();
        let key = ConnectionKey::new("a");
        let v1 = cache.publish(key.clone(), draft("t1"));
        let v2 = cache.publish(key.clone(), draft("t2"));
        assert!(v2 > v1);
        assert_eq!(cache.current().version, v2);
        assert!(cache.current().table_exists(None, "t2"));
    }

    #[test]
    fn test_old_snapshot_is_untouched_by_publish() {
        let cache = SharedMetadataCache::new();
        let key = ConnectionKey::new("a");
        cache.publish(key.clone(), draft("t1"));
        let held = cache.current();
        cache.publish(key, draft("t2"));
        assert!(held.table_exists(None, "t1"));
        assert!(!held.table_exists(None, "t2"));
    }

    #[test]
    fn test_inactive_publish_does_not_switch() {
        let cache = SharedMetadataCache::new();
        let a = ConnectionKey::new("a");
        let b = ConnectionKey::new("b");
        cache.publish(a.clone(), draft("ta"));
        let mut rx = cache.subscribe();
        let vb = cache.publish(b.clone(), draft("tb"));
        assert_eq!(cache.current().connection, a);
        assert!(rx.try_recv().is_err());

        assert_eq!(cache.activate(&b).unwrap(), vb);
        assert_eq!(rx.try_recv().unwrap(), vb);
        assert!(cache.current().table_exists(None, "tb"));
    }

    #[test]
    fn test_activate_unknown_connection() {
        let cache = SharedMetadataCache::new();
        assert!(matches!(
            cache.activate(&ConnectionKey::new("nope")),
            Err(IntelError::UnknownConnection(_))
        ));
    }

    #[test]
    fn test_forget_active_installs_newer_empty_snapshot() {
        let cache = SharedMetadataCache::new();
        let key = ConnectionKey::new("t");
        let v1 = cache.publish(key.clone(), draft("t"));
        let mut rx = cache.subscribe();

        cache.forget(&key);
        let current = cache.current();
        assert!(current.version > v1);
        assert!(!current.table_exists(None, "t"));
        assert_eq!(current.default_schema, "public");
        assert_eq!(rx.try_recv().unwrap(), current.version);
        assert_eq!(cache.active(), None);
    }

    #[test]
    fn test_forget_inactive_is_silent() {
        let cache = SharedMetadataCache::new();
        let a = ConnectionKey::new("a");
        let b = ConnectionKey::new("b");
        let va = cache.publish(a.clone(), draft("ta"));
        cache.publish(b.clone(), draft("tb"));
        let mut rx = cache.subscribe();

        cache.forget(&b);
        assert_eq!(cache.current().version, va);
        assert!(rx.try_recv().is_err());
        assert!(cache.activate(&b).is_err());
    }

    #[test]
    fn test_ttl_expiry() {
        let cache = SharedMetadataCache::new().with_ttl(Duration::ZERO);
        cache.publish(ConnectionKey::new("a"), draft("t"));
        std::thread::sleep(Duration::from_millis(2));
        assert!(cache.is_expired(&cache.current()));
    }
}
