//! Bounded cache for gather results.
//!
//! Entries expire after a per-entry TTL and the total serialized size of all
//! entries is held under a configurable ceiling.
//!
//! # Policies
//!
//! | Concern | Policy |
//! |---------|--------|
//! | Expiry | Checked lazily on read; [`BoundedCache::sweep`] reclaims proactively |
//! | Memory pressure | Oldest insertion evicted first (FIFO, not LRU) |
//! | Oversized entry | Inserted anyway once the cache is empty; the ceiling is soft |
//! | Hit rate | hits / lookups since creation; `clear` keeps the counters |
//!
//! The cache is a plain data structure: it takes `&mut self` and leaves
//! locking to its owner.

use chrono::{DateTime, Utc};
use contextkeeper_core::{CacheError, Clock, GatherResult};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// One cached gather result.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub result: GatherResult,
    pub inserted_at: DateTime<Utc>,
    pub ttl: Duration,
    /// Serialized size of the key plus the result
    pub size_bytes: u64,
}

impl CacheEntry {
    /// An entry is served while `now - inserted_at <= ttl`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let age = now - self.inserted_at;
        match chrono::Duration::from_std(self.ttl) {
            Ok(ttl) => age > ttl,
            Err(_) => false,
        }
    }
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of live entries
    pub size: usize,
    pub memory_usage_bytes: u64,
    pub memory_usage_mb: f64,
    pub max_size_mb: f64,
    /// hits / (hits + misses), 0 before the first lookup
    pub hit_rate: f64,
    pub hits: u64,
    pub misses: u64,
    /// Entries removed to make room for new ones
    pub evictions: u64,
    /// Entries removed because their TTL elapsed
    pub expirations: u64,
}

/// What a `set` call displaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertOutcome {
    pub size_bytes: u64,
    /// Entries evicted to make room
    pub evicted: usize,
    /// Whether an entry under the same key was replaced
    pub replaced: bool,
}

/// A TTL + memory-bounded map from cache key to gather result.
pub struct BoundedCache {
    entries: HashMap<String, CacheEntry>,
    /// Keys in insertion order, oldest first
    order: VecDeque<String>,
    total_bytes: u64,
    max_bytes: u64,
    clock: Arc<dyn Clock>,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

impl BoundedCache {
    /// Create a cache holding at most `max_bytes` of serialized results.
    pub fn new(max_bytes: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            total_bytes: 0,
            max_bytes,
            clock,
            hits: 0,
            misses: 0,
            evictions: 0,
            expirations: 0,
        }
    }

    /// Create a cache with a ceiling expressed in megabytes.
    pub fn with_max_size_mb(max_size_mb: f64, clock: Arc<dyn Clock>) -> Self {
        Self::new((max_size_mb * BYTES_PER_MB) as u64, clock)
    }

    /// Look up a live entry. Counts as a hit or a miss; an expired entry is
    /// dropped and counts as a miss.
    pub fn get(&mut self, key: &str) -> Option<&CacheEntry> {
        let now = self.clock.now();
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(now),
            None => {
                self.misses += 1;
                return None;
            }
        };

        if expired {
            debug!(key, "Cache entry expired");
            self.remove(key);
            self.expirations += 1;
            self.misses += 1;
            return None;
        }

        self.hits += 1;
        self.entries.get(key)
    }

    /// Insert a result, evicting the oldest entries until it fits.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        result: GatherResult,
        ttl: Duration,
    ) -> Result<InsertOutcome, CacheError> {
        let key = key.into();
        let size_bytes = measure(&key, &result)?;
        let replaced = self.remove(&key).is_some();

        let mut evicted = 0;
        while self.total_bytes + size_bytes > self.max_bytes {
            if self.evict_oldest().is_none() {
                break;
            }
            evicted += 1;
        }
        self.evictions += evicted as u64;

        if size_bytes > self.max_bytes {
            warn!(
                key = %key,
                size_bytes,
                max_bytes = self.max_bytes,
                "Cache entry exceeds the memory ceiling on its own; inserting anyway"
            );
        }

        let entry = CacheEntry {
            key: key.clone(),
            result,
            inserted_at: self.clock.now(),
            ttl,
            size_bytes,
        };
        self.total_bytes += size_bytes;
        self.order.push_back(key.clone());
        self.entries.insert(key, entry);

        Ok(InsertOutcome {
            size_bytes,
            evicted: evicted as usize,
            replaced,
        })
    }

    /// Drop one entry. Returns whether it existed.
    pub fn invalidate(&mut self, key: &str) -> bool {
        self.remove(key).is_some()
    }

    /// Drop every entry. Hit/miss counters survive.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.total_bytes = 0;
    }

    /// Remove every expired entry, returning how many were dropped.
    pub fn sweep(&mut self) -> usize {
        let now = self.clock.now();
        let expired: Vec<String> = self
            .order
            .iter()
            .filter(|key| self.entries.get(*key).is_some_and(|e| e.is_expired(now)))
            .cloned()
            .collect();

        for key in &expired {
            self.remove(key);
        }
        self.expirations += expired.len() as u64;
        expired.len()
    }

    pub fn stats(&self) -> CacheStats {
        let lookups = self.hits + self.misses;
        CacheStats {
            size: self.entries.len(),
            memory_usage_bytes: self.total_bytes,
            memory_usage_mb: self.total_bytes as f64 / BYTES_PER_MB,
            max_size_mb: self.max_bytes as f64 / BYTES_PER_MB,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                self.hits as f64 / lookups as f64
            },
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            expirations: self.expirations,
        }
    }

    /// Whether a key is present, without touching the counters or the TTL.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys in insertion order, oldest first.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn memory_usage_bytes(&self) -> u64 {
        self.total_bytes
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.order.retain(|k| k != key);
        self.total_bytes -= entry.size_bytes;
        Some(entry)
    }

    fn evict_oldest(&mut self) -> Option<CacheEntry> {
        let key = self.order.pop_front()?;
        let entry = self.entries.remove(&key)?;
        self.total_bytes -= entry.size_bytes;
        debug!(key = %key, size_bytes = entry.size_bytes, "Evicted cache entry");
        Some(entry)
    }
}

fn measure(key: &str, result: &GatherResult) -> Result<u64, CacheError> {
    let body = serde_json::to_vec(result).map_err(|e| CacheError::Sizing {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    Ok((key.len() + body.len()) as u64)
}
