//! File-backed result cache
//!
//! Each entry lives in its own `<sha256(key)>.json` file. Writes go through a
//! temporary file in the same directory that is then renamed into place, so a
//! reader never observes a half-written entry and concurrent writers of one
//! key resolve to whichever rename lands last.

use super::{CacheEntry, CacheResult, CacheStats, CacheStore, DEFAULT_TTL};
use chrono::Utc;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, trace, warn};

pub struct FileCache {
    cache_dir: PathBuf,
    ttl: Duration,
}

impl FileCache {
    /// Open (and create if needed) a cache directory with the default TTL
    pub fn new(cache_dir: PathBuf) -> CacheResult<Self> {
        Self::with_ttl(cache_dir, DEFAULT_TTL)
    }

    pub fn with_ttl(cache_dir: PathBuf, ttl: Duration) -> CacheResult<Self> {
        fs::create_dir_all(&cache_dir)?;
        Ok(Self { cache_dir, ttl })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        self.cache_dir.join(format!("{:x}.json", hasher.finalize()))
    }

    fn read_entry(&self, path: &Path) -> CacheResult<Option<CacheEntry>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn write_entry(&self, key: &str, entry: &CacheEntry) -> CacheResult<()> {
        let json = serde_json::to_string_pretty(entry)?;
        let mut tmp = NamedTempFile::new_in(&self.cache_dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.persist(self.entry_path(key)).map_err(|e| e.error)?;
        Ok(())
    }

    /// Remove an entry file, reporting whether it was there to remove
    fn evict(&self, path: &Path) -> bool {
        match fs::remove_file(path) {
            Ok(()) => true,
            Err(e) => {
                debug!("Unable to remove cache entry {}: {}", path.display(), e);
                false
            }
        }
    }

    fn json_files(&self) -> CacheResult<Vec<(PathBuf, u64)>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.cache_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                let len = entry.metadata().map(|m| m.len()).unwrap_or(0);
                files.push((path, len));
            }
        }
        Ok(files)
    }
}

impl CacheStore for FileCache {
    fn get(&self, key: &str) -> Option<Value> {
        let path = self.entry_path(key);
        let entry = match self.read_entry(&path) {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                trace!("Cache miss for {}", key);
                return None;
            }
            Err(e) => {
                debug!("Ignoring unreadable cache entry {}: {}", path.display(), e);
                return None;
            }
        };

        if entry.is_expired(Utc::now(), self.ttl) {
            debug!("Cache entry for {} expired, removing", key);
            self.evict(&path);
            return None;
        }

        debug!("Cache hit for {}", key);
        Some(entry.payload)
    }

    fn set(&self, key: &str, value: &Value) {
        if let Err(e) = self.write_entry(key, &CacheEntry::new(value.clone())) {
            warn!("Unable to write cache entry for {}: {}", key, e);
        }
    }

    fn clear(&self) -> CacheResult<usize> {
        let files = self.json_files()?;
        for (path, _) in &files {
            fs::remove_file(path)?;
        }
        Ok(files.len())
    }

    fn stats(&self) -> CacheResult<CacheStats> {
        let files = self.json_files()?;
        Ok(CacheStats {
            entries: files.len(),
            total_bytes: files.iter().map(|(_, len)| len).sum(),
        })
    }
}
