//! Time-bounded cache of resolved `latest` versions, shared between runs
//! through a single JSON file in the system temp directory.
//!
//! Entries hold the bare version reported by the registry. The range
//! operator is always taken from the manifest being updated, never from the
//! cache. Keys are scoped to the registry they were resolved against, so
//! switching registries never serves another registry's answer.

use crate::error::Result;
use crate::utils::write_atomic;
use indexmap::IndexMap;
use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

pub const CACHE_FILE_NAME: &str = "odc-cache.json";
pub const DEFAULT_TTL_SECS: u64 = 15 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub value: String,
    pub stored_at: Timestamp,
}

/// In-memory view of the cache file. Reads never touch the disk again after
/// [`TtlCache::open`]; writes are buffered until [`TtlCache::flush`].
#[derive(Debug)]
pub struct TtlCache {
    path: PathBuf,
    ttl: SignedDuration,
    entries: IndexMap<String, CacheEntry>,
    namespace: String,
    dirty: bool,
}

impl TtlCache {
    pub fn default_path() -> PathBuf {
        std::env::temp_dir().join(CACHE_FILE_NAME)
    }

    /// Load the cache file at `path`. A missing, unreadable or corrupt file
    /// yields an empty cache.
    pub fn open<P: AsRef<Path>>(path: P, ttl: Duration) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("ignoring corrupt cache file {}: {}", path.display(), e);
                    IndexMap::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => IndexMap::new(),
            Err(e) => {
                warn!("ignoring unreadable cache file {}: {}", path.display(), e);
                IndexMap::new()
            }
        };

        debug!(path = %path.display(), entries = entries.len(), "cache opened");

        Self {
            path,
            ttl: SignedDuration::try_from(ttl).unwrap_or(SignedDuration::MAX),
            entries,
            namespace: String::new(),
            dirty: false,
        }
    }

    /// Scope every key to `namespace`, typically the registry base URL.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    fn scoped_key(&self, key: &str) -> String {
        if self.namespace.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", self.namespace, key)
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_at(key, Timestamp::now())
    }

    fn get_at(&self, key: &str, now: Timestamp) -> Option<&str> {
        self.entries
            .get(&self.scoped_key(key))
            .filter(|entry| is_fresh(entry, now, self.ttl))
            .map(|entry| entry.value.as_str())
    }

    pub fn set(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        self.set_at(key, value, Timestamp::now());
    }

    fn set_at(&mut self, key: impl AsRef<str>, value: impl Into<String>, now: Timestamp) {
        self.entries.insert(
            self.scoped_key(key.as_ref()),
            CacheEntry {
                value: value.into(),
                stored_at: now,
            },
        );
        self.dirty = true;
    }

    /// Persist buffered entries. Expired entries are pruned on the way out.
    /// Does nothing when no entry was set since the cache was opened.
    pub fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        let now = Timestamp::now();
        let ttl = self.ttl;
        self.entries.retain(|_, entry| is_fresh(entry, now, ttl));

        let content = serde_json::to_string(&self.entries)?;
        write_atomic(&self.path, content.as_bytes())?;
        self.dirty = false;

        debug!(path = %self.path.display(), entries = self.entries.len(), "cache flushed");
        Ok(())
    }
}

/// Entries stamped in the future (clock skew, hand edits) are stale.
fn is_fresh(entry: &CacheEntry, now: Timestamp, ttl: SignedDuration) -> bool {
    let age = now.duration_since(entry.stored_at);
    age >= SignedDuration::ZERO && age < ttl
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn ttl() -> Duration {
        Duration::from_secs(DEFAULT_TTL_SECS)
    }

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempdir().unwrap();
        let cache = TtlCache::open(dir.path().join(CACHE_FILE_NAME), ttl());
        assert_eq!(cache.get("left-pad"), None);
    }

    #[test]
    fn corrupt_file_opens_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CACHE_FILE_NAME);
        fs::write(&path, "not json").unwrap();

        let cache = TtlCache::open(&path, ttl());
        assert_eq!(cache.get("left-pad"), None);
    }

    #[test]
    fn entry_expires_after_ttl() {
        let dir = tempdir().unwrap();
        let mut cache = TtlCache::open(dir.path().join(CACHE_FILE_NAME), ttl());
        let stored = Timestamp::from_second(1_700_000_000).unwrap();
        cache.set_at("left-pad", "1.3.0", stored);

        let fresh = stored + SignedDuration::from_secs(14 * 60);
        let expired = stored + SignedDuration::from_secs(15 * 60);
        assert_eq!(cache.get_at("left-pad", fresh), Some("1.3.0"));
        assert_eq!(cache.get_at("left-pad", expired), None);
    }

    #[test]
    fn set_overwrites_expired_entry() {
        let dir = tempdir().unwrap();
        let mut cache = TtlCache::open(dir.path().join(CACHE_FILE_NAME), ttl());
        let stored = Timestamp::from_second(1_700_000_000).unwrap();
        let later = stored + SignedDuration::from_secs(60 * 60);
        cache.set_at("left-pad", "1.2.0", stored);
        cache.set_at("left-pad", "1.3.0", later);

        assert_eq!(cache.get_at("left-pad", later), Some("1.3.0"));
    }

    #[test]
    fn flush_round_trips_through_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CACHE_FILE_NAME);

        let mut cache = TtlCache::open(&path, ttl());
        cache.set("left-pad", "1.3.0");
        cache.flush().unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["left-pad"]["value"], "1.3.0");
        assert!(raw["left-pad"]["storedAt"].is_string());

        let reopened = TtlCache::open(&path, ttl());
        assert_eq!(reopened.get("left-pad"), Some("1.3.0"));
    }

    #[test]
    fn flush_without_changes_does_not_create_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CACHE_FILE_NAME);

        let mut cache = TtlCache::open(&path, ttl());
        cache.flush().unwrap();

        assert!(!path.exists());
    }

    #[test]
    fn flush_prunes_expired_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CACHE_FILE_NAME);

        let mut cache = TtlCache::open(&path, ttl());
        cache.set_at("stale", "0.1.0", Timestamp::from_second(1_000_000_000).unwrap());
        cache.set("fresh", "2.0.0");
        cache.flush().unwrap();

        let reopened = TtlCache::open(&path, ttl());
        assert_eq!(reopened.get("fresh"), Some("2.0.0"));
        assert!(!fs::read_to_string(&path).unwrap().contains("stale"));
    }

    #[test]
    fn entry_from_the_future_is_stale() {
        let dir = tempdir().unwrap();
        let mut cache = TtlCache::open(dir.path().join(CACHE_FILE_NAME), ttl());
        let now = Timestamp::from_second(1_700_000_000).unwrap();
        cache.set_at("left-pad", "1.3.0", now + SignedDuration::from_secs(60 * 60));

        assert_eq!(cache.get_at("left-pad", now), None);
    }

    #[test]
    fn namespaces_do_not_share_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CACHE_FILE_NAME);

        let mut mirror = TtlCache::open(&path, ttl()).with_namespace("https://mirror.example");
        mirror.set("left-pad", "9.9.9");
        mirror.flush().unwrap();

        let npmjs = TtlCache::open(&path, ttl()).with_namespace("https://registry.npmjs.org");
        assert_eq!(npmjs.get("left-pad"), None);

        let mirror = TtlCache::open(&path, ttl()).with_namespace("https://mirror.example");
        assert_eq!(mirror.get("left-pad"), Some("9.9.9"));
    }
}
