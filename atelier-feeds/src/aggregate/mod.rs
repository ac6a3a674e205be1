//! Aggregator: concurrent fan-out, failure capture, merge, dedup, cache.
//!
//! Feeds are queried concurrently; their answers are concatenated in
//! declaration order and deduplicated by id/url so the first feed to
//! report a product wins.

pub mod dedup;
pub mod fanout;

pub use dedup::deduplicate;
pub use fanout::{AggregateOutcome, Aggregator, CacheStatus};
