//! In-memory cache for aggregated product lists.
//!
//! Entries are keyed by the (lowercased, trimmed query, page) pair and kept
//! for the stale window. Within the fresh window an entry is served as-is;
//! past it the entry only backs up a fan-out in which every feed failed.
//! Uses [`moka`] for async-friendly caching with automatic eviction.

use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::future::Cache;

use crate::config::FeedsConfig;
use crate::error::FeedError;
use crate::types::Product;

/// Composite cache key: normalised query + page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    query: String,
    page: u32,
}

impl CacheKey {
    /// Build a deterministic cache key. The query is lowercased and trimmed.
    pub fn new(query: &str, page: u32) -> Self {
        Self {
            query: query.trim().to_lowercase(),
            page,
        }
    }
}

/// How a cached entry relates to the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale,
}

/// A cached aggregate with its fetch time.
#[derive(Debug, Clone)]
pub struct CachedAggregate {
    pub products: Arc<Vec<Product>>,
    /// Feeds that failed in the cycle that produced this entry.
    pub failures: Arc<Vec<FeedError>>,
    pub fetched_at: Instant,
}

/// Aggregator-owned cache with fresh and stale windows.
#[derive(Clone)]
pub struct AggregateCache {
    inner: Cache<CacheKey, CachedAggregate>,
    fresh: Duration,
}

impl std::fmt::Debug for AggregateCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregateCache")
            .field("fresh", &self.fresh)
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}

impl AggregateCache {
    /// Create a cache; entries expire entirely after `stale`.
    pub fn new(fresh: Duration, stale: Duration, max_entries: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_entries)
                .time_to_live(stale)
                .build(),
            fresh,
        }
    }

    /// Build from configuration. Returns `None` when caching is disabled
    /// (`cache_stale_seconds == 0`).
    pub fn from_config(config: &FeedsConfig) -> Option<Self> {
        (config.cache_stale_seconds > 0).then(|| {
            Self::new(
                Duration::from_secs(config.cache_fresh_seconds),
                Duration::from_secs(config.cache_stale_seconds),
                config.max_cache_entries,
            )
        })
    }

    /// Look up an entry and classify it against the current time.
    pub async fn get(&self, key: &CacheKey) -> Option<(CachedAggregate, Freshness)> {
        self.get_at(key, Instant::now()).await
    }

    /// Look up an entry and classify it against `now`.
    pub async fn get_at(&self, key: &CacheKey, now: Instant) -> Option<(CachedAggregate, Freshness)> {
        let entry = self.inner.get(key).await?;
        let age = now.saturating_duration_since(entry.fetched_at);
        let freshness = if age < self.fresh {
            Freshness::Fresh
        } else {
            Freshness::Stale
        };
        Some((entry, freshness))
    }

    /// Store an aggregate fetched now, with the failures of its cycle.
    pub async fn insert(&self, key: CacheKey, products: Vec<Product>, failures: Vec<FeedError>) {
        self.insert_at(key, products, failures, Instant::now()).await;
    }

    pub async fn insert_at(
        &self,
        key: CacheKey,
        products: Vec<Product>,
        failures: Vec<FeedError>,
        fetched_at: Instant,
    ) {
        let entry = CachedAggregate {
            products: Arc::new(products),
            failures: Arc::new(failures),
            fetched_at,
        };
        self.inner.insert(key, entry).await;
    }
}
