//! # atelier-feeds
//!
//! Product feed aggregation and ranking for Atelier.
//!
//! This crate queries several commerce feeds concurrently, normalises their
//! payloads into one [`Product`] shape, deduplicates, and ranks the merged
//! list against a free-text query and shopper preferences.
//!
//! ## Design
//!
//! - One [`FeedAdapter`] per upstream: Skimlinks (static key), Rakuten
//!   (cached OAuth token), Amazon PA-API 5 (signed requests)
//! - The [`Aggregator`] fans out with a per-feed deadline and tolerates
//!   partial failure; the first declared feed wins on duplicate keys
//! - An Aggregator-owned cache with fresh and stale windows
//! - [`rank`] is pure: filter, score, stable sort
//!
//! ## Security
//!
//! - Credentials are never serialised or printed by `Debug`
//! - Query text is logged only at trace level

pub mod adapter;
pub mod aggregate;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod feeds;
pub mod http;
pub mod ranking;
pub mod sequence;
pub mod signing;
pub mod token;
pub mod types;

pub use adapter::FeedAdapter;
pub use aggregate::{AggregateOutcome, Aggregator, CacheStatus};
pub use config::FeedsConfig;
pub use error::{AggregateEmpty, ConfigError, FeedError, Result};
pub use ranking::rank;
pub use sequence::SearchSequence;
pub use types::{FeedSource, Gender, PriceRange, Product, QueryContext, SortMode};

/// Aggregate one page for `ctx.query` and rank it against `ctx`.
///
/// The returned outcome carries the ranked products; failures, advisory
/// and cache status are those of the aggregation.
///
/// # Panics
///
/// Panics if `ctx` has NaN price bounds, as [`rank`] does.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> Result<(), atelier_feeds::ConfigError> {
/// let aggregator = atelier_feeds::Aggregator::from_config(&atelier_feeds::FeedsConfig::default())?;
/// let ctx = atelier_feeds::QueryContext::for_query("silk blouse");
/// let outcome = atelier_feeds::search(&aggregator, &ctx, 1).await;
/// for product in &outcome.products {
///     println!("{}: {:?}", product.id, product.score);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn search(aggregator: &Aggregator, ctx: &QueryContext, page: u32) -> AggregateOutcome {
    let mut outcome = aggregator.aggregate_page(&ctx.query, page).await;
    outcome.products = rank(&outcome.products, ctx);
    outcome
}
