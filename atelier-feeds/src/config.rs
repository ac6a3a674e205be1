//! Feed configuration with sensible defaults.
//!
//! [`FeedsConfig`] controls which feeds are queried and in what order,
//! per-call timeouts, the aggregate cache windows, and each feed's
//! endpoint and credentials. Credentials normally come from the
//! environment via [`FeedsConfig::apply_env`] rather than config files.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::FeedSource;

/// Skimlinks product API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SkimlinksConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub per_page: u32,
}

impl Default for SkimlinksConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://product-api.skimlinks.com".into(),
            per_page: 50,
        }
    }
}

/// Rakuten Advertising settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RakutenConfig {
    #[serde(skip_serializing)]
    pub client_id: Option<String>,
    #[serde(skip_serializing)]
    pub client_secret: Option<String>,
    /// Base for both `/token` and `/productsearch/1.0`.
    pub base_url: String,
    pub per_page: u32,
    /// Lifetime assumed when the token response has no `expires_in`.
    pub default_token_ttl_seconds: u64,
}

impl Default for RakutenConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            base_url: "https://api.rakutenadvertising.com".into(),
            per_page: 50,
            default_token_ttl_seconds: 3600,
        }
    }
}

/// Amazon Product Advertising API 5 settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AmazonConfig {
    #[serde(skip_serializing)]
    pub access_key: Option<String>,
    #[serde(skip_serializing)]
    pub secret_key: Option<String>,
    #[serde(skip_serializing)]
    pub partner_tag: Option<String>,
    pub region: String,
    /// Host placed in the signed `host` header.
    pub host: String,
    /// Overrides `https://{host}` as the request base, for tests and proxies.
    pub base_url: Option<String>,
    pub marketplace: String,
    pub item_count: u32,
}

impl Default for AmazonConfig {
    fn default() -> Self {
        Self {
            access_key: None,
            secret_key: None,
            partner_tag: None,
            region: "us-east-1".into(),
            host: "webservices.amazon.com".into(),
            base_url: None,
            marketplace: "www.amazon.com".into(),
            item_count: 20,
        }
    }
}

impl AmazonConfig {
    pub fn endpoint_base(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}", self.host))
    }
}

/// Configuration for the whole aggregation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedsConfig {
    /// Feeds to query, in precedence order: on a dedup collision the
    /// earlier feed's record wins.
    pub sources: Vec<FeedSource>,
    /// Per-feed deadline in seconds.
    pub timeout_seconds: u64,
    /// Cached aggregates younger than this are served without fan-out.
    pub cache_fresh_seconds: u64,
    /// Cached aggregates are kept this long as a fallback when every feed
    /// fails. Set to 0 to disable caching.
    pub cache_stale_seconds: u64,
    pub max_cache_entries: u64,
    pub skimlinks: SkimlinksConfig,
    pub rakuten: RakutenConfig,
    pub amazon: AmazonConfig,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            sources: FeedSource::all().to_vec(),
            timeout_seconds: 8,
            cache_fresh_seconds: 120,
            cache_stale_seconds: 600,
            max_cache_entries: 100,
            skimlinks: SkimlinksConfig::default(),
            rakuten: RakutenConfig::default(),
            amazon: AmazonConfig::default(),
        }
    }
}

impl FeedsConfig {
    /// Validates this configuration.
    ///
    /// Checks:
    /// - `sources` must not be empty and must not repeat a feed
    /// - `timeout_seconds` must be greater than 0
    /// - `cache_fresh_seconds` must be <= `cache_stale_seconds` unless caching is off
    /// - every feed base URL must be an absolute `http(s)` URL
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError("at least one feed source must be enabled".into()));
        }
        for (i, source) in self.sources.iter().enumerate() {
            if self.sources[..i].contains(source) {
                return Err(ConfigError(format!("feed source {source} listed twice")));
            }
        }
        if self.timeout_seconds == 0 {
            return Err(ConfigError("timeout_seconds must be greater than 0".into()));
        }
        if self.cache_stale_seconds > 0 && self.cache_fresh_seconds > self.cache_stale_seconds {
            return Err(ConfigError(
                "cache_fresh_seconds must be <= cache_stale_seconds".into(),
            ));
        }
        check_base_url("skimlinks.base_url", &self.skimlinks.base_url)?;
        check_base_url("rakuten.base_url", &self.rakuten.base_url)?;
        check_base_url("amazon.base_url", &self.amazon.endpoint_base())?;
        Ok(())
    }

    /// Fill credentials and endpoint overrides from environment variables.
    pub fn apply_env(&mut self) {
        self.apply_vars(|name| std::env::var(name).ok());
    }

    /// Fill credentials from an arbitrary variable lookup. Empty values are
    /// ignored.
    pub fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("SKIMLINKS_PRODUCT_API_KEY") {
            self.skimlinks.api_key = Some(v);
        }
        if let Some(v) = get("RAKUTEN_CLIENT_ID") {
            self.rakuten.client_id = Some(v);
        }
        if let Some(v) = get("RAKUTEN_CLIENT_SECRET") {
            self.rakuten.client_secret = Some(v);
        }
        if let Some(v) = get("AMAZON_PAAPI_ACCESS_KEY") {
            self.amazon.access_key = Some(v);
        }
        if let Some(v) = get("AMAZON_PAAPI_SECRET_KEY") {
            self.amazon.secret_key = Some(v);
        }
        if let Some(v) = get("AMAZON_PAAPI_PARTNER_TAG") {
            self.amazon.partner_tag = Some(v);
        }
        if let Some(v) = get("AMAZON_PAAPI_REGION") {
            self.amazon.region = v;
        }
        if let Some(v) = get("AMAZON_PAAPI_HOST") {
            self.amazon.host = v;
        }
    }
}

fn check_base_url(field: &str, raw: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(raw).map_err(|e| ConfigError(format!("{field}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError(format!("{field}: unsupported scheme {}", parsed.scheme())));
    }
    Ok(())
}
