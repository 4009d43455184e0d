//! Time-bounded key/value store with a disk snapshot.
//!
//! `TtlCache` keeps every entry in memory and mirrors the durable subset to a
//! single JSON snapshot file, so the cache survives restarts. Expiration is
//! lazy: an entry whose deadline has passed is treated as absent and evicted
//! on the next read, not by a background sweeper.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Whether an entry is written to the snapshot file.
///
/// Session-scoped data (anything auth-adjacent, per-session request results)
/// is kept in memory only; the flag is declared at `set` time rather than
/// inferred from the key name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Persist {
    Durable,
    SessionOnly,
}

/// One cached value with its timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    data: Value,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
    persist: Persist,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.map(|at| Utc::now() > at).unwrap_or(false)
    }
}

/// Snapshot document written to disk. Only `Persist::Durable` entries that
/// have not expired make it in (persisted is a subset of in-memory).
#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheSnapshot {
    entries: BTreeMap<String, CacheEntry>,
}

/// Persisted key/value cache with optional per-entry expiry.
///
/// All mutation goes through `set`/`clear`/`clear_all`; nothing outside this
/// type touches an entry's fields. Construct one instance at startup and
/// share it (see `SharedCache`) instead of reaching for a global.
#[derive(Debug)]
pub struct TtlCache {
    path: Option<PathBuf>,
    entries: BTreeMap<String, CacheEntry>,
}

impl TtlCache {
    /// Cache with no disk mirror. Used in tests and short-lived tools.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: BTreeMap::new(),
        }
    }

    /// Rehydrate from the snapshot at `path`. A missing or corrupt snapshot
    /// yields an empty cache; this constructor never fails.
    pub fn load(path: PathBuf) -> Self {
        let entries = match Self::read_snapshot(&path) {
            Ok(Some(snapshot)) => {
                let mut entries = snapshot.entries;
                entries.retain(|_, entry| !entry.is_expired());
                debug!(count = entries.len(), "Cache snapshot loaded");
                entries
            }
            Ok(None) => BTreeMap::new(),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable cache snapshot");
                BTreeMap::new()
            }
        };
        Self {
            path: Some(path),
            entries,
        }
    }

    /// Wrap this cache for sharing between orchestrators.
    pub fn into_shared(self) -> super::SharedCache {
        std::sync::Arc::new(tokio::sync::Mutex::new(self))
    }

    /// Store `value` under `key`, replacing any existing entry. With a `ttl`
    /// the entry expires at `now + ttl`; without one it lives until cleared.
    pub fn set<T: Serialize>(&mut self, key: &str, value: &T, ttl: Option<Duration>, persist: Persist) {
        let data = match serde_json::to_value(value) {
            Ok(data) => data,
            Err(e) => {
                warn!(key, error = %e, "Value not serializable, not cached");
                return;
            }
        };
        let now = Utc::now();
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                data,
                created_at: now,
                expires_at: ttl.map(|ttl| now + ttl),
                persist,
            },
        );
        self.write_snapshot();
    }

    /// Fetch the value under `key`, or `None` when absent or expired.
    /// Reading an expired entry also evicts it.
    pub fn get<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        let entry = self.entries.get(key)?;
        if entry.is_expired() {
            debug!(key, "Evicting expired cache entry");
            self.entries.remove(key);
            self.write_snapshot();
            return None;
        }
        serde_json::from_value(entry.data.clone()).ok()
    }

    /// True when `key` is absent or past its deadline. Entries without a
    /// deadline never expire. Pure read; nothing is evicted.
    pub fn is_expired(&self, key: &str) -> bool {
        self.entries.get(key).map(CacheEntry::is_expired).unwrap_or(true)
    }

    /// Remove a single entry so the next `get` misses.
    pub fn clear(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.write_snapshot();
        }
    }

    /// Remove every entry.
    pub fn clear_all(&mut self) {
        self.entries.clear();
        self.write_snapshot();
    }

    /// Remove and return the entry under `key`, timestamps intact. Paired
    /// with `restore_entry` by refresh flows that keep the last known good
    /// value when a re-fetch fails.
    pub fn take_entry(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key);
        if entry.is_some() {
            self.write_snapshot();
        }
        entry
    }

    /// Put back an entry previously removed with `take_entry`, unless it has
    /// expired in the meantime.
    pub fn restore_entry(&mut self, key: &str, entry: CacheEntry) {
        if entry.is_expired() {
            return;
        }
        self.entries.insert(key.to_string(), entry);
        self.write_snapshot();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn read_snapshot(path: &PathBuf) -> Result<Option<CacheSnapshot>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read cache snapshot: {}", path.display()))?;
        let snapshot = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache snapshot: {}", path.display()))?;
        Ok(Some(snapshot))
    }

    /// Rewrite the durable subset to disk. Persistence is best-effort: a
    /// failed write leaves the in-memory cache authoritative.
    fn write_snapshot(&self) {
        let Some(path) = &self.path else {
            return;
        };
        let snapshot = CacheSnapshot {
            entries: self
                .entries
                .iter()
                .filter(|(_, entry)| entry.persist == Persist::Durable && !entry.is_expired())
                .map(|(key, entry)| (key.clone(), entry.clone()))
                .collect(),
        };
        if let Err(e) = Self::write_snapshot_file(path, &snapshot) {
            warn!(error = %e, "Failed to write cache snapshot");
        }
    }

    fn write_snapshot_file(path: &PathBuf, snapshot: &CacheSnapshot) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(snapshot)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_then_get_roundtrip() {
        let mut cache = TtlCache::in_memory();
        cache.set("overview", &vec![1, 2, 3], Some(Duration::minutes(5)), Persist::Durable);
        assert_eq!(cache.get::<Vec<i32>>("overview"), Some(vec![1, 2, 3]));
        assert!(!cache.is_expired("overview"));
    }

    #[test]
    fn test_get_missing_key() {
        let mut cache = TtlCache::in_memory();
        assert_eq!(cache.get::<String>("nope"), None);
        assert!(cache.is_expired("nope"));
    }

    #[test]
    fn test_expired_entry_is_absent_and_evicted() {
        let mut cache = TtlCache::in_memory();
        cache.set("short", &"value", Some(Duration::minutes(1)), Persist::Durable);

        // Backdate the deadline instead of sleeping.
        cache.entries.get_mut("short").unwrap().expires_at = Some(Utc::now() - Duration::seconds(1));

        assert!(cache.is_expired("short"));
        assert_eq!(cache.get::<String>("short"), None);
        // The read evicted it.
        assert!(cache.is_empty());
    }

    #[test]
    fn test_entry_without_ttl_never_expires() {
        let mut cache = TtlCache::in_memory();
        cache.set("pinned", &42, None, Persist::Durable);
        assert!(!cache.is_expired("pinned"));
        assert_eq!(cache.get::<i32>("pinned"), Some(42));
    }

    #[test]
    fn test_clear_single_key() {
        let mut cache = TtlCache::in_memory();
        cache.set("a", &1, None, Persist::Durable);
        cache.set("b", &2, None, Persist::Durable);
        cache.clear("a");
        assert_eq!(cache.get::<i32>("a"), None);
        assert_eq!(cache.get::<i32>("b"), Some(2));
    }

    #[test]
    fn test_clear_all() {
        let mut cache = TtlCache::in_memory();
        cache.set("a", &1, None, Persist::Durable);
        cache.set("b", &2, None, Persist::SessionOnly);
        cache.clear_all();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_set_overwrites_unconditionally() {
        let mut cache = TtlCache::in_memory();
        cache.set("key", &"first", None, Persist::Durable);
        cache.set("key", &"second", Some(Duration::minutes(1)), Persist::Durable);
        assert_eq!(cache.get::<String>("key"), Some("second".to_string()));
    }

    #[test]
    fn test_snapshot_roundtrip_excludes_session_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");

        let mut cache = TtlCache::load(path.clone());
        cache.set("durable", &"kept", Some(Duration::hours(1)), Persist::Durable);
        cache.set("session", &"dropped", Some(Duration::hours(1)), Persist::SessionOnly);
        drop(cache);

        let mut reloaded = TtlCache::load(path);
        assert_eq!(reloaded.get::<String>("durable"), Some("kept".to_string()));
        // Session-only entries never reach disk.
        assert_eq!(reloaded.get::<String>("session"), None);
    }

    #[test]
    fn test_corrupt_snapshot_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{ not json").unwrap();

        let cache = TtlCache::load(path);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_expired_entries_skipped_on_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");

        let mut cache = TtlCache::load(path.clone());
        cache.set("stale", &1, Some(Duration::hours(1)), Persist::Durable);
        cache.entries.get_mut("stale").unwrap().expires_at = Some(Utc::now() - Duration::seconds(1));
        // Trigger a snapshot rewrite; the expired entry must not be written.
        cache.set("fresh", &2, Some(Duration::hours(1)), Persist::Durable);
        drop(cache);

        let mut reloaded = TtlCache::load(path);
        assert_eq!(reloaded.get::<i32>("stale"), None);
        assert_eq!(reloaded.get::<i32>("fresh"), Some(2));
    }

    #[test]
    fn test_take_and_restore_entry() {
        let mut cache = TtlCache::in_memory();
        cache.set("key", &"original", None, Persist::Durable);

        let entry = cache.take_entry("key").unwrap();
        assert_eq!(cache.get::<String>("key"), None);

        cache.restore_entry("key", entry);
        assert_eq!(cache.get::<String>("key"), Some("original".to_string()));
    }

    #[test]
    fn test_restore_skips_expired_entry() {
        let mut cache = TtlCache::in_memory();
        cache.set("key", &"old", Some(Duration::minutes(1)), Persist::Durable);
        let mut entry = cache.take_entry("key").unwrap();
        entry.expires_at = Some(Utc::now() - Duration::seconds(1));

        cache.restore_entry("key", entry);
        assert_eq!(cache.get::<String>("key"), None);
    }
}
