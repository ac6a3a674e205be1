//! Concurrent fan-out across all feeds, merge and dedup.

use std::sync::Arc;
use std::time::Duration;

use crate::adapter::FeedAdapter;
use crate::cache::{AggregateCache, CacheKey, Freshness};
use crate::config::FeedsConfig;
use crate::error::{AggregateEmpty, ConfigError, FeedError};
use crate::feeds::build_adapters;
use crate::types::Product;

use super::dedup::deduplicate;

/// Where the products of an [`AggregateOutcome`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Fresh fan-out.
    Miss,
    /// Served from a cache entry inside the fresh window; no feed was called.
    Fresh,
    /// Every feed failed and a stale cache entry was served instead.
    Stale,
}

/// Result of one aggregation cycle.
#[derive(Debug, Clone)]
pub struct AggregateOutcome {
    /// Merged, deduplicated products in feed declaration order.
    pub products: Vec<Product>,
    /// Feeds that failed, in declaration order. A fresh cache hit reports
    /// the failures of the cycle that filled the entry.
    pub failures: Vec<FeedError>,
    /// Set when every feed failed and nothing could be served.
    pub advisory: Option<AggregateEmpty>,
    pub cache: CacheStatus,
}

impl AggregateOutcome {
    /// `true` when at least one feed failed in the cycle that produced the
    /// products (for a fresh cache hit, the cycle that filled the entry).
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Fans a query out to every configured feed and merges the answers.
pub struct Aggregator {
    adapters: Vec<Arc<dyn FeedAdapter>>,
    timeout: Duration,
    cache: Option<AggregateCache>,
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<&str> = self.adapters.iter().map(|a| a.source_id()).collect();
        f.debug_struct("Aggregator")
            .field("adapters", &ids)
            .field("timeout", &self.timeout)
            .field("cache", &self.cache)
            .finish()
    }
}

impl Aggregator {
    /// Create an aggregator over `adapters` with no cache.
    ///
    /// Declaration order of `adapters` is the dedup precedence order.
    pub fn new(adapters: Vec<Arc<dyn FeedAdapter>>, timeout: Duration) -> Self {
        Self {
            adapters,
            timeout,
            cache: None,
        }
    }

    /// Attach an aggregate cache.
    pub fn with_cache(mut self, cache: AggregateCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Validate `config`, build its adapters and cache.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an invalid configuration or if an HTTP
    /// client cannot be built.
    pub fn from_config(config: &FeedsConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let adapters = build_adapters(config).map_err(|e| ConfigError(e.to_string()))?;
        let mut aggregator = Self::new(adapters, Duration::from_secs(config.timeout_seconds));
        aggregator.cache = AggregateCache::from_config(config);
        Ok(aggregator)
    }

    pub fn adapters(&self) -> &[Arc<dyn FeedAdapter>] {
        &self.adapters
    }

    /// Find an adapter by its source id.
    pub fn adapter(&self, source_id: &str) -> Option<&Arc<dyn FeedAdapter>> {
        self.adapters.iter().find(|a| a.source_id() == source_id)
    }

    /// Query a single feed by id under the same deadline as a fan-out.
    ///
    /// Returns `None` for an unknown source. Bypasses the aggregate cache.
    pub async fn search_one(
        &self,
        source_id: &str,
        query: &str,
        page: u32,
    ) -> Option<Result<Vec<Product>, FeedError>> {
        let adapter = self.adapter(source_id)?;
        Some(self.call(adapter.as_ref(), query, page.max(1)).await)
    }

    /// Aggregate the first page of results for `query`.
    pub async fn aggregate(&self, query: &str) -> AggregateOutcome {
        self.aggregate_page(query, 1).await
    }

    /// Aggregate one page of results across all feeds.
    ///
    /// # Pipeline
    ///
    /// 1. Serve a fresh cache entry if one exists
    /// 2. Fan out to all feeds concurrently with [`futures::future::join_all`],
    ///    each call bounded by the per-feed timeout
    /// 3. Log per-feed errors at warn level; collect successful results
    /// 4. Concatenate in declaration order and deduplicate (first feed wins)
    /// 5. If every feed failed, serve a stale cache entry or attach the
    ///    [`AggregateEmpty`] advisory
    ///
    /// Pages are 1-based; `0` is treated as `1`. Never fails: feed errors
    /// are reported through the outcome.
    pub async fn aggregate_page(&self, query: &str, page: u32) -> AggregateOutcome {
        let page = page.max(1);
        let key = CacheKey::new(query, page);
        let cached = match &self.cache {
            Some(cache) => cache.get(&key).await,
            None => None,
        };
        if let Some((entry, Freshness::Fresh)) = &cached {
            tracing::debug!(count = entry.products.len(), "aggregate served from cache");
            return AggregateOutcome {
                products: entry.products.as_ref().clone(),
                failures: entry.failures.as_ref().clone(),
                advisory: None,
                cache: CacheStatus::Fresh,
            };
        }

        let (products, failures, answered) = self.fan_out(query, page).await;

        if answered > 0 {
            if let Some(cache) = &self.cache {
                cache.insert(key, products.clone(), failures.clone()).await;
            }
            return AggregateOutcome {
                products,
                failures,
                advisory: None,
                cache: CacheStatus::Miss,
            };
        }

        if let Some((entry, _)) = cached {
            tracing::warn!(
                failed = failures.len(),
                "all feeds failed; serving stale aggregate"
            );
            return AggregateOutcome {
                products: entry.products.as_ref().clone(),
                failures,
                advisory: None,
                cache: CacheStatus::Stale,
            };
        }

        let advisory = failures.first().map(|first| AggregateEmpty {
            failed: failures.len(),
            first_error: first.to_string(),
        });
        AggregateOutcome {
            products,
            failures,
            advisory,
            cache: CacheStatus::Miss,
        }
    }

    /// Query every adapter and merge. Returns merged products, failures
    /// and the number of adapters that answered.
    async fn fan_out(&self, query: &str, page: u32) -> (Vec<Product>, Vec<FeedError>, usize) {
        let futures: Vec<_> = self
            .adapters
            .iter()
            .map(|adapter| self.call(adapter.as_ref(), query, page))
            .collect();

        let outcomes = futures::future::join_all(futures).await;

        let mut merged: Vec<Product> = Vec::new();
        let mut failures: Vec<FeedError> = Vec::new();
        let mut answered = 0usize;

        for (adapter, outcome) in self.adapters.iter().zip(outcomes) {
            let source = adapter.source_id();
            match outcome {
                Ok(products) => {
                    answered += 1;
                    tracing::debug!(source, count = products.len(), "feed returned products");
                    merged.extend(products);
                }
                Err(err) => {
                    tracing::warn!(source, error = %err, "feed query failed");
                    failures.push(err);
                }
            }
        }

        (deduplicate(merged), failures, answered)
    }

    async fn call(
        &self,
        adapter: &dyn FeedAdapter,
        query: &str,
        page: u32,
    ) -> Result<Vec<Product>, FeedError> {
        match tokio::time::timeout(self.timeout, adapter.search(query, page)).await {
            Ok(result) => result,
            Err(_) => Err(FeedError::Timeout {
                source_id: adapter.source_id().to_string(),
                seconds: self.timeout.as_secs(),
            }),
        }
    }
}
