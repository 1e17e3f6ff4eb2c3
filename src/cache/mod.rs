//! TTL result cache
//!
//! Results are stored under a string key (see [`crate::query::QueryParams::cache_key`])
//! and expire `ttl` after they were written. Expiry is only checked when an
//! entry is read; an expired entry is removed at that point.
//!
//! Caching is best-effort: [`CacheStore::get`] and [`CacheStore::set`] never
//! return errors. Failures are logged and treated as a miss or a skipped write.

pub mod file;
pub mod memory;

pub use file::FileCache;
pub use memory::MemoryCache;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Default time-to-live for cached results
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Result type for cache maintenance operations
pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Lock poisoned: {0}")]
    Lock(String),
}

/// A stored payload and the moment it was written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub stored_at: DateTime<Utc>,
    pub payload: Value,
}

impl CacheEntry {
    pub fn new(payload: Value) -> Self {
        Self {
            stored_at: Utc::now(),
            payload,
        }
    }

    /// Whether more than `ttl` has passed between `stored_at` and `now`
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match TimeDelta::from_std(ttl) {
            Ok(ttl) => now - self.stored_at > ttl,
            // A TTL too large to represent never expires
            Err(_) => false,
        }
    }
}

/// Summary of what a cache currently holds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub total_bytes: u64,
}

/// Key/value store with lazy TTL expiry
pub trait CacheStore: Send + Sync {
    /// Fetch a fresh payload; errors and expired entries read as a miss
    fn get(&self, key: &str) -> Option<Value>;

    /// Store a payload, logging and swallowing any write failure
    fn set(&self, key: &str, value: &Value);

    /// Remove every entry, returning how many were dropped
    fn clear(&self) -> CacheResult<usize>;

    fn stats(&self) -> CacheResult<CacheStats>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_expiry_boundary() {
        let entry = CacheEntry::new(json!({"ok": true}));
        let ttl = Duration::from_secs(300);

        assert!(!entry.is_expired(entry.stored_at, ttl));
        assert!(!entry.is_expired(entry.stored_at + TimeDelta::seconds(300), ttl));
        assert!(entry.is_expired(entry.stored_at + TimeDelta::seconds(301), ttl));
    }

    #[test]
    fn test_huge_ttl_never_expires() {
        let entry = CacheEntry::new(json!(1));
        let later = entry.stored_at + TimeDelta::days(365 * 100);
        assert!(!entry.is_expired(later, Duration::MAX));
    }

    #[test]
    fn test_entry_round_trips_through_json() {
        let entry = CacheEntry::new(json!({"columns": ["ctr"]}));
        let text = serde_json::to_string(&entry).unwrap();
        let back: CacheEntry = serde_json::from_str(&text).unwrap();
        assert_eq!(back, entry);
    }
}
