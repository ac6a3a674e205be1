//! Trait definition for pluggable feed adapters.
//!
//! Each upstream commerce feed implements [`FeedAdapter`] to provide a
//! uniform interface for querying and normalising product listings.

use async_trait::async_trait;

use crate::error::FeedError;
use crate::types::Product;

/// A pluggable upstream feed.
///
/// Implementors own everything specific to their upstream:
///
/// - request construction and query encoding
/// - authentication (static key, cached bearer token, or request signing)
/// - defensive parsing of the proprietary response into [`Product`]s
/// - deduplication of their own result set by [`Product::dedup_key`]
///
/// All implementations must be `Send + Sync` for concurrent fan-out.
#[async_trait]
pub trait FeedAdapter: Send + Sync {
    /// Stable identifier of this feed, used in errors, logs and routes.
    fn source_id(&self) -> &str;

    /// Search the feed.
    ///
    /// Zero matches is `Ok(vec![])`, never an error.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] for missing configuration, authentication
    /// failures, non-2xx or transport failures, and unreadable payloads.
    async fn search(&self, query: &str, page: u32) -> Result<Vec<Product>, FeedError>;
}
