//! Upstream feed adapters.
//!
//! Each module provides a struct implementing [`crate::adapter::FeedAdapter`]
//! that authenticates against one commerce feed and normalises its payload.

pub mod amazon;
pub mod fields;
pub mod rakuten;
pub mod skimlinks;

use std::sync::Arc;

pub use amazon::AmazonFeed;
pub use rakuten::RakutenFeed;
pub use skimlinks::SkimlinksFeed;

use crate::adapter::FeedAdapter;
use crate::config::FeedsConfig;
use crate::error::FeedError;
use crate::http::build_client;
use crate::types::FeedSource;

/// Build one adapter per entry of `config.sources`, in declaration order.
///
/// Missing credentials are not an error here; the adapter reports them as
/// [`FeedError::Config`] when searched.
///
/// # Errors
///
/// Returns [`FeedError::Config`] if an HTTP client cannot be constructed.
pub fn build_adapters(config: &FeedsConfig) -> Result<Vec<Arc<dyn FeedAdapter>>, FeedError> {
    config
        .sources
        .iter()
        .map(|source| build_adapter(*source, config))
        .collect()
}

/// Build the adapter for a single source.
pub fn build_adapter(
    source: FeedSource,
    config: &FeedsConfig,
) -> Result<Arc<dyn FeedAdapter>, FeedError> {
    let client = build_client(source.id(), config.timeout_seconds)?;
    let adapter: Arc<dyn FeedAdapter> = match source {
        FeedSource::Skimlinks => Arc::new(SkimlinksFeed::new(config.skimlinks.clone(), client)),
        FeedSource::Rakuten => Arc::new(RakutenFeed::new(config.rakuten.clone(), client)),
        FeedSource::Amazon => Arc::new(AmazonFeed::new(config.amazon.clone(), client)),
    };
    Ok(adapter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapters_follow_declared_order() {
        let config = FeedsConfig {
            sources: vec![FeedSource::Amazon, FeedSource::Skimlinks],
            ..Default::default()
        };
        let adapters = build_adapters(&config).expect("clients build");
        let ids: Vec<&str> = adapters.iter().map(|a| a.source_id()).collect();
        assert_eq!(ids, vec!["amazon", "skimlinks"]);
    }

    #[test]
    fn default_config_builds_all_three() {
        let adapters = build_adapters(&FeedsConfig::default()).expect("clients build");
        let ids: Vec<&str> = adapters.iter().map(|a| a.source_id()).collect();
        assert_eq!(ids, vec!["rakuten", "skimlinks", "amazon"]);
    }
}
