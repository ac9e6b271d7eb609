//! Sled-based cache for internal data API responses.
//!
//! Only congress records are cached. Generated text is always produced fresh.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("database error: {0}")]
    DbError(#[from] sled::Error),
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// A cached response body with the time it was fetched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResponse {
    /// The request URL
    pub url: String,
    /// When the response was fetched
    pub fetched_at: DateTime<Utc>,
    /// Decoded JSON body
    pub body: serde_json::Value,
}

impl CachedResponse {
    pub fn new(url: String, body: serde_json::Value) -> Self {
        Self {
            url,
            fetched_at: Utc::now(),
            body,
        }
    }

    /// Whether the entry is still inside the revalidation window
    pub fn is_fresh(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(max_age) {
            Ok(max_age) => now.signed_duration_since(self.fetched_at) < max_age,
            Err(_) => true,
        }
    }
}

/// Response cache keyed by URL hash.
#[derive(Clone)]
pub struct ResponseCache {
    db: sled::Db,
}

impl ResponseCache {
    /// Open or create the cache at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CacheError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Store a response body for a URL
    pub fn store(&self, url: &str, body: &serde_json::Value) -> Result<(), CacheError> {
        self.put(&CachedResponse::new(url.to_string(), body.clone()))
    }

    /// Insert an entry as is, keeping its fetch time
    pub fn put(&self, entry: &CachedResponse) -> Result<(), CacheError> {
        let key = Self::hash_url(&entry.url);
        let value = serde_json::to_vec(entry)?;
        self.db.insert(key.as_bytes(), value)?;
        self.db.flush()?;
        Ok(())
    }

    /// Retrieve the entry for a URL regardless of age
    ///
    /// Keys are hashes, so an entry stored for a different URL under the same
    /// key is treated as a miss.
    pub fn get(&self, url: &str) -> Result<Option<CachedResponse>, CacheError> {
        let key = Self::hash_url(url);
        match self.db.get(key.as_bytes())? {
            Some(data) => {
                let entry: CachedResponse = serde_json::from_slice(&data)?;
                if entry.url != url {
                    tracing::debug!(url, stored = %entry.url, "cache key collision, ignoring entry");
                    return Ok(None);
                }
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// Retrieve the body for a URL if it was fetched within `max_age`
    pub fn get_fresh(
        &self,
        url: &str,
        max_age: Duration,
    ) -> Result<Option<serde_json::Value>, CacheError> {
        let now = Utc::now();
        Ok(self
            .get(url)?
            .filter(|entry| entry.is_fresh(max_age, now))
            .map(|entry| entry.body))
    }

    /// Remove every entry older than `max_age`, returning how many were removed
    pub fn purge_stale(&self, max_age: Duration) -> Result<usize, CacheError> {
        let now = Utc::now();
        let mut removed = 0;
        for item in self.db.iter() {
            let (key, value) = item?;
            let stale = match serde_json::from_slice::<CachedResponse>(&value) {
                Ok(entry) => !entry.is_fresh(max_age, now),
                // unreadable entries are dropped as well
                Err(_) => true,
            };
            if stale {
                self.db.remove(key)?;
                removed += 1;
            }
        }
        self.db.flush()?;
        Ok(removed)
    }

    /// Get the number of cached responses
    pub fn count(&self) -> usize {
        self.db.len()
    }

    /// Create a hash of the URL for use as a key
    fn hash_url(url: &str) -> String {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};
        let mut hasher = DefaultHasher::new();
        url.hash(&mut hasher);
        format!("{:x}", hasher.finish())
    }
}
