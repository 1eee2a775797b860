use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use moka::future::Cache;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::result::SchemaValidationResult;

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of results held in memory
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_entries: 10_000 }
    }
}

/// Identity of a validation input: where it lives and what it contains
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub path: PathBuf,
    /// Hex-encoded SHA-256 of the file bytes
    pub content_hash: String,
}

impl Fingerprint {
    pub fn new(path: impl Into<PathBuf>, content: &[u8]) -> Self {
        let digest = Sha256::digest(content);
        Self {
            path: path.into(),
            content_hash: format!("{:x}", digest),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.path.display(), &self.content_hash[..12.min(self.content_hash.len())])
    }
}

/// In-memory cache of completed validation results
///
/// Uses `moka` for concurrent access and "thundering herd" protection: when several
/// callers ask for the same fingerprint at once, one computes and the rest await its result.
pub struct ValidationCache {
    cache: Cache<Fingerprint, Arc<SchemaValidationResult>>,
    lookups: AtomicU64,
    computations: AtomicU64,
}

impl ValidationCache {
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder().max_capacity(config.max_entries).build();

        Self {
            cache,
            lookups: AtomicU64::new(0),
            computations: AtomicU64::new(0),
        }
    }

    /// Get a result from the cache, or compute and store it if missing.
    ///
    /// `compute` is only polled if the key is missing; concurrent requests for the same key
    /// wait for the single leader to finish.
    pub async fn get_or_compute<Fut>(
        &self,
        fingerprint: Fingerprint,
        compute: Fut,
    ) -> Arc<SchemaValidationResult>
    where
        Fut: Future<Output = SchemaValidationResult>,
    {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        self.cache
            .get_with(fingerprint, async {
                self.computations.fetch_add(1, Ordering::Relaxed);
                Arc::new(compute.await)
            })
            .await
    }

    pub async fn get(&self, fingerprint: &Fingerprint) -> Option<Arc<SchemaValidationResult>> {
        self.cache.get(fingerprint).await
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.cache.contains_key(fingerprint)
    }

    /// Number of times a result was actually computed
    pub fn computations(&self) -> u64 {
        self.computations.load(Ordering::Relaxed)
    }

    /// Get cache statistics
    pub async fn stats(&self) -> CacheStats {
        // Run sync to ensure all pending operations are complete
        self.cache.run_pending_tasks().await;

        let lookups = self.lookups.load(Ordering::Relaxed);
        let misses = self.computations();
        CacheStats {
            entry_count: self.cache.entry_count(),
            lookups,
            hits: lookups.saturating_sub(misses),
            misses,
        }
    }

    /// Clear all entries; counters are kept
    pub async fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}

/// Statistics for cache operations
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub entry_count: u64,
    pub lookups: u64,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            self.hits as f64 / self.lookups as f64
        }
    }
}
