//! Integration tests for the aggregate → rank pipeline.
//!
//! These tests use in-process mock feeds (no network calls) to exercise
//! fan-out, partial failure, precedence on duplicate keys, deadlines and
//! the aggregate cache.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use atelier_feeds::cache::AggregateCache;
use atelier_feeds::catalog::sample_products;
use atelier_feeds::{
    Aggregator, CacheStatus, FeedAdapter, FeedError, Product, QueryContext, SortMode, rank,
};

/// A scripted feed that counts its calls and can be switched to failing.
struct MockFeed {
    id: &'static str,
    products: Vec<Product>,
    delay: Duration,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl MockFeed {
    fn new(id: &'static str, products: Vec<Product>) -> Arc<Self> {
        Arc::new(Self {
            id,
            products,
            delay: Duration::ZERO,
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        })
    }

    fn slow(id: &'static str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            id,
            products: vec![product("slow", "never arrives")],
            delay,
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(id: &'static str) -> Arc<Self> {
        let feed = Self::new(id, vec![]);
        feed.set_failing(true);
        feed
    }

    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedAdapter for MockFeed {
    fn source_id(&self) -> &str {
        self.id
    }

    async fn search(&self, _query: &str, _page: u32) -> Result<Vec<Product>, FeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(FeedError::upstream(self.id, Some(500), "mock failure"));
        }
        Ok(self.products.clone())
    }
}

fn product(id: &str, name: &str) -> Product {
    Product {
        id: id.to_string(),
        name: Some(name.to_string()),
        in_stock: Some(true),
        ..Default::default()
    }
}

fn adapters(feeds: &[&Arc<MockFeed>]) -> Vec<Arc<dyn FeedAdapter>> {
    feeds
        .iter()
        .map(|f| Arc::clone(*f) as Arc<dyn FeedAdapter>)
        .collect()
}

fn ids(products: &[Product]) -> Vec<&str> {
    products.iter().map(|p| p.id.as_str()).collect()
}

#[tokio::test]
async fn partial_failure_keeps_surviving_feeds() {
    let a = MockFeed::new("a", vec![product("a1", "A one")]);
    let b = MockFeed::failing("b");
    let c = MockFeed::new("c", vec![product("c1", "C one")]);
    let aggregator = Aggregator::new(adapters(&[&a, &b, &c]), Duration::from_secs(2));

    let outcome = aggregator.aggregate("anything").await;
    assert_eq!(ids(&outcome.products), vec!["a1", "c1"]);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].source_id(), "b");
    assert!(outcome.advisory.is_none());
}

#[tokio::test]
async fn first_declared_feed_wins_on_collision() {
    let a = MockFeed::new("a", vec![product("shared", "from a")]);
    let b = MockFeed::new("b", vec![product("shared", "from b"), product("b2", "B two")]);
    let aggregator = Aggregator::new(adapters(&[&a, &b]), Duration::from_secs(2));

    let outcome = aggregator.aggregate("anything").await;
    assert_eq!(ids(&outcome.products), vec!["shared", "b2"]);
    assert_eq!(outcome.products[0].name.as_deref(), Some("from a"));

    let reversed = Aggregator::new(adapters(&[&b, &a]), Duration::from_secs(2));
    let outcome = reversed.aggregate("anything").await;
    assert_eq!(outcome.products[0].name.as_deref(), Some("from b"));
}

#[tokio::test]
async fn slow_feed_times_out_without_blocking_others() {
    let fast = MockFeed::new("fast", vec![product("f1", "fast one")]);
    let slow = MockFeed::slow("slow", Duration::from_secs(5));
    let aggregator = Aggregator::new(adapters(&[&fast, &slow]), Duration::from_millis(100));

    let started = Instant::now();
    let outcome = aggregator.aggregate("anything").await;
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(ids(&outcome.products), vec!["f1"]);
    assert!(matches!(outcome.failures[0], FeedError::Timeout { .. }));
}

#[tokio::test]
async fn every_feed_failing_yields_advisory_not_error() {
    let a = MockFeed::failing("a");
    let b = MockFeed::failing("b");
    let aggregator = Aggregator::new(adapters(&[&a, &b]), Duration::from_secs(2));

    let outcome = aggregator.aggregate("anything").await;
    assert!(outcome.products.is_empty());
    let advisory = outcome.advisory.expect("advisory expected");
    assert_eq!(advisory.failed, 2);
    assert!(advisory.to_string().contains("a: upstream error"));
}

#[tokio::test]
async fn fresh_cache_entry_skips_fan_out() {
    let a = MockFeed::new("a", vec![product("a1", "A one")]);
    let cache = AggregateCache::new(Duration::from_secs(120), Duration::from_secs(600), 10);
    let aggregator = Aggregator::new(adapters(&[&a]), Duration::from_secs(2)).with_cache(cache);

    let first = aggregator.aggregate("Silk").await;
    let second = aggregator.aggregate("  silk ").await;
    assert_eq!(first.cache, CacheStatus::Miss);
    assert_eq!(second.cache, CacheStatus::Fresh);
    assert_eq!(ids(&second.products), vec!["a1"]);
    assert_eq!(a.calls(), 1);

    let other_page = aggregator.aggregate_page("silk", 2).await;
    assert_eq!(other_page.cache, CacheStatus::Miss);
    assert_eq!(a.calls(), 2);
}

#[tokio::test]
async fn stale_entry_backs_up_total_failure() {
    let a = MockFeed::new("a", vec![product("a1", "A one")]);
    // Fresh window of zero: every entry is immediately stale.
    let cache = AggregateCache::new(Duration::ZERO, Duration::from_secs(600), 10);
    let aggregator = Aggregator::new(adapters(&[&a]), Duration::from_secs(2)).with_cache(cache);

    let first = aggregator.aggregate("silk").await;
    assert_eq!(first.cache, CacheStatus::Miss);

    a.set_failing(true);
    let second = aggregator.aggregate("silk").await;
    assert_eq!(a.calls(), 2);
    assert_eq!(second.cache, CacheStatus::Stale);
    assert_eq!(ids(&second.products), vec!["a1"]);
    assert!(second.advisory.is_none());
    assert_eq!(second.failures.len(), 1);
}

#[tokio::test]
async fn total_failure_is_not_cached() {
    let a = MockFeed::failing("a");
    let cache = AggregateCache::new(Duration::from_secs(120), Duration::from_secs(600), 10);
    let aggregator = Aggregator::new(adapters(&[&a]), Duration::from_secs(2)).with_cache(cache);

    assert!(aggregator.aggregate("silk").await.advisory.is_some());
    a.set_failing(false);
    let outcome = aggregator.aggregate("silk").await;
    assert_eq!(outcome.cache, CacheStatus::Miss);
    assert_eq!(a.calls(), 2);
}

#[tokio::test]
async fn aggregate_then_rank_sample_scenario() {
    let a = MockFeed::new("catalog", sample_products());
    let aggregator = Aggregator::new(adapters(&[&a]), Duration::from_secs(2));

    let outcome = aggregator.aggregate("").await;
    let ranked = rank(&outcome.products, &QueryContext::default());
    let prices: Vec<f64> = ranked.iter().filter_map(|p| p.price).collect();
    assert_eq!(prices, vec![98.0, 145.0, 48.0]);

    let by_rating = rank(
        &outcome.products,
        &QueryContext {
            sort: SortMode::Rating,
            ..Default::default()
        },
    );
    assert_eq!(ids(&by_rating), vec!["p2", "p1", "p3"]);
}

#[tokio::test]
async fn dedup_is_idempotent_across_cycles() {
    let a = MockFeed::new("a", vec![product("x", "x"), product("x", "x again"), product("y", "y")]);
    let aggregator = Aggregator::new(adapters(&[&a]), Duration::from_secs(2));

    let once = aggregator.aggregate("q").await.products;
    let again = atelier_feeds::aggregate::deduplicate(once.clone());
    assert_eq!(once, again);
    assert_eq!(ids(&once), vec!["x", "y"]);
}
