//! Result cache: serialized records keyed by normalized request identity.
//!
//! ## Backends
//!
//! - [`MemoryCache`]: process-local, for tests and embedding.
//! - [`FileCache`]: one JSON envelope per key under a directory, with an
//!   in-memory index rebuilt on open. When the cache exceeds
//!   `max_entries`, the least-recently-accessed entry is evicted (both
//!   from the index and from disk).
//!
//! Expired entries are absent. Writers race last-writer-wins.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use base64::Engine as _;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Default maximum number of cached results before LRU eviction.
const DEFAULT_MAX_ENTRIES: usize = 5000;

const ENTRY_EXTENSION: &str = "json";

/// Counters for `court cache stats` and the scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Live (unexpired) entries.
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Key/value store with per-entry TTL.
pub trait ResultCache: Send + Sync {
    /// Fresh value for `key`, or `None` when absent or expired.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError>;

    /// Remove `key`. Returns whether anything was removed.
    fn invalidate(&self, key: &str) -> Result<bool, CacheError>;

    /// Remove everything. Returns how many entries were removed.
    fn clear(&self) -> Result<usize, CacheError>;

    fn stats(&self) -> CacheStats;
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Counters {
    fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self, entries: usize) -> CacheStats {
        CacheStats {
            entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

// ---------------------------------------------------------------------------
// Memory backend
// ---------------------------------------------------------------------------

struct MemoryEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// Concurrent in-memory cache.
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, MemoryEntry>,
    counters: Counters,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let now = Instant::now();
        let fresh = self
            .entries
            .get(key)
            .filter(|e| e.expires_at > now)
            .map(|e| e.value.clone());

        match fresh {
            Some(value) => {
                self.counters.hit();
                Ok(Some(value))
            }
            None => {
                self.entries.remove_if(key, |_, e| e.expires_at <= now);
                self.counters.miss();
                Ok(None)
            }
        }
    }

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        self.entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_vec(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    fn invalidate(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries.remove(key).is_some())
    }

    fn clear(&self) -> Result<usize, CacheError> {
        let n = self.entries.len();
        self.entries.clear();
        Ok(n)
    }

    fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let live = self.entries.iter().filter(|e| e.expires_at > now).count();
        self.counters.snapshot(live)
    }
}

// ---------------------------------------------------------------------------
// File backend
// ---------------------------------------------------------------------------

/// On-disk form of one entry.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    key: String,
    stored_at: DateTime<Utc>,
    ttl_secs: u64,
    /// Base64 of the cached bytes.
    payload: String,
}

impl Envelope {
    fn is_expired(&self) -> bool {
        is_expired(self.stored_at, Duration::from_secs(self.ttl_secs))
    }
}

fn is_expired(stored_at: DateTime<Utc>, ttl: Duration) -> bool {
    match (Utc::now() - stored_at).to_std() {
        Ok(age) => age >= ttl,
        // Stored "in the future": clock moved backwards; keep it.
        Err(_) => false,
    }
}

/// Index entry with metadata.
struct IndexEntry {
    path: PathBuf,
    stored_at: DateTime<Utc>,
    ttl: Duration,
    /// When the entry was last accessed (for LRU).
    last_accessed: Instant,
}

impl IndexEntry {
    fn is_expired(&self) -> bool {
        is_expired(self.stored_at, self.ttl)
    }
}

/// Directory-backed cache with LRU eviction.
pub struct FileCache {
    cache_dir: PathBuf,
    index: Mutex<HashMap<String, IndexEntry>>,
    max_entries: usize,
    counters: Counters,
}

impl FileCache {
    /// Open (creating if needed) a cache directory.
    ///
    /// Scans existing envelopes to rebuild the index. Unreadable and
    /// expired envelopes are deleted during the scan.
    pub fn open(cache_dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir)?;

        let mut index = HashMap::new();
        for entry in fs::read_dir(&cache_dir)?.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            match read_envelope(&path) {
                Ok(Some(env)) if !env.is_expired() => {
                    index.insert(
                        env.key,
                        IndexEntry {
                            path,
                            stored_at: env.stored_at,
                            ttl: Duration::from_secs(env.ttl_secs),
                            last_accessed: Instant::now(),
                        },
                    );
                }
                Ok(Some(_)) => remove_file_quietly(&path),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("dropping unreadable cache entry {}: {e}", path.display());
                    remove_file_quietly(&path);
                }
            }
        }

        tracing::debug!(
            "FileCache initialized: {} entries from {}",
            index.len(),
            cache_dir.display()
        );

        Ok(Self {
            cache_dir,
            index: Mutex::new(index),
            max_entries: DEFAULT_MAX_ENTRIES,
            counters: Counters::default(),
        })
    }

    /// Cap the number of entries kept before LRU eviction.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        use std::hash::Hasher;
        let mut hasher = fnv::FnvHasher::default();
        hasher.write(key.as_bytes());
        self.cache_dir
            .join(format!("{:016x}.{ENTRY_EXTENSION}", hasher.finish()))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, IndexEntry>>, CacheError> {
        self.index
            .lock()
            .map_err(|_| CacheError::Unavailable("cache index lock poisoned".to_string()))
    }
}

/// `Ok(None)` when the file vanished underneath us.
fn read_envelope(path: &Path) -> Result<Option<Envelope>, CacheError> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_slice(&raw)?))
}

fn remove_file_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != ErrorKind::NotFound {
            tracing::warn!("failed to remove cache file {}: {e}", path.display());
        }
    }
}

fn evict_lru(index: &mut HashMap<String, IndexEntry>) {
    let oldest = index
        .iter()
        .min_by_key(|(_, e)| e.last_accessed)
        .map(|(k, _)| k.clone());
    if let Some(key) = oldest {
        if let Some(entry) = index.remove(&key) {
            tracing::debug!("evicting cache entry {key}");
            remove_file_quietly(&entry.path);
        }
    }
}

impl ResultCache for FileCache {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut index = self.lock()?;

        let Some(entry) = index.get_mut(key) else {
            self.counters.miss();
            return Ok(None);
        };
        if entry.is_expired() {
            if let Some(stale) = index.remove(key) {
                remove_file_quietly(&stale.path);
            }
            self.counters.miss();
            return Ok(None);
        }
        entry.last_accessed = Instant::now();
        let path = entry.path.clone();

        let decoded = match read_envelope(&path) {
            Ok(Some(env)) if env.key == key => base64::engine::general_purpose::STANDARD
                .decode(env.payload.as_bytes())
                .ok(),
            Ok(_) => None,
            Err(CacheError::Io(e)) => return Err(CacheError::Io(e)),
            Err(_) => None,
        };

        match decoded {
            Some(bytes) => {
                self.counters.hit();
                Ok(Some(bytes))
            }
            None => {
                tracing::warn!("cache entry for {key} is corrupt; dropping it");
                index.remove(key);
                remove_file_quietly(&path);
                self.counters.miss();
                Ok(None)
            }
        }
    }

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let mut index = self.lock()?;

        if index.len() >= self.max_entries && !index.contains_key(key) {
            evict_lru(&mut index);
        }

        let stored_at = Utc::now();
        let envelope = Envelope {
            key: key.to_string(),
            stored_at,
            ttl_secs: ttl.as_secs(),
            payload: base64::engine::general_purpose::STANDARD.encode(value),
        };
        let path = self.entry_path(key);

        // Write-then-rename so readers never see a half-written envelope.
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec(&envelope)?)?;
        fs::rename(&tmp, &path)?;

        index.insert(
            key.to_string(),
            IndexEntry {
                path,
                stored_at,
                ttl: Duration::from_secs(ttl.as_secs()),
                last_accessed: Instant::now(),
            },
        );
        Ok(())
    }

    fn invalidate(&self, key: &str) -> Result<bool, CacheError> {
        let mut index = self.lock()?;
        match index.remove(key) {
            Some(entry) => {
                remove_file_quietly(&entry.path);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn clear(&self) -> Result<usize, CacheError> {
        let mut index = self.lock()?;
        let n = index.len();
        for (_, entry) in index.drain() {
            remove_file_quietly(&entry.path);
        }
        Ok(n)
    }

    fn stats(&self) -> CacheStats {
        let live = self
            .lock()
            .map(|index| index.values().filter(|e| !e.is_expired()).count())
            .unwrap_or(0);
        self.counters.snapshot(live)
    }
}
