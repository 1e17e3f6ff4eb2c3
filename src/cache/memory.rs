//! In-process result cache

use super::{CacheEntry, CacheError, CacheResult, CacheStats, CacheStore, DEFAULT_TTL};
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, warn};

/// Cache held in a map, for tests and one-shot runs that should not touch disk
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    #[cfg(test)]
    fn insert_entry(&self, key: &str, entry: CacheEntry) {
        self.entries.write().unwrap().insert(key.to_string(), entry);
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        {
            let entries = self.entries.read().ok()?;
            let entry = entries.get(key)?;
            if !entry.is_expired(Utc::now(), self.ttl) {
                return Some(entry.payload.clone());
            }
        }

        debug!("Cache entry for {} expired, removing", key);
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(key);
        }
        None
    }

    fn set(&self, key: &str, value: &Value) {
        match self.entries.write() {
            Ok(mut entries) => {
                entries.insert(key.to_string(), CacheEntry::new(value.clone()));
            }
            Err(e) => warn!("Unable to write cache entry for {}: {}", key, e),
        }
    }

    fn clear(&self) -> CacheResult<usize> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| CacheError::Lock(e.to_string()))?;
        let count = entries.len();
        entries.clear();
        Ok(count)
    }

    fn stats(&self) -> CacheResult<CacheStats> {
        let entries = self
            .entries
            .read()
            .map_err(|e| CacheError::Lock(e.to_string()))?;
        let total_bytes = entries
            .values()
            .map(|e| e.payload.to_string().len() as u64)
            .sum();
        Ok(CacheStats {
            entries: entries.len(),
            total_bytes,
        })
    }
}
