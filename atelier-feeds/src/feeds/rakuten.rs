//! Rakuten Advertising product search: OAuth client-credentials bearer token.
//!
//! Every search needs a bearer token from `/token`. The token is cached in
//! the adapter's own [`TokenCache`] for its stated lifetime and refetched
//! only after expiry. A 401 from the search endpoint drops the cached token
//! so the next cycle fetches a new one; there is no in-cycle retry.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use serde_json::Value;

use crate::adapter::FeedAdapter;
use crate::aggregate::dedup::deduplicate;
use crate::config::RakutenConfig;
use crate::error::FeedError;
use crate::http;
use crate::token::{MAX_LIFETIME, TokenCache};
use crate::types::{FeedSource, Gender, Product};

use super::fields::{first_array, first_number, first_str};

const SOURCE: &str = "rakuten";

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

/// Rakuten Advertising product search adapter.
pub struct RakutenFeed {
    config: RakutenConfig,
    client: reqwest::Client,
    tokens: TokenCache,
}

impl std::fmt::Debug for RakutenFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RakutenFeed")
            .field("base_url", &self.config.base_url)
            .field("has_credentials", &self.credentials().is_ok())
            .finish()
    }
}

impl RakutenFeed {
    pub fn new(config: RakutenConfig, client: reqwest::Client) -> Self {
        Self {
            config,
            client,
            tokens: TokenCache::new(),
        }
    }

    fn base(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn credentials(&self) -> Result<(&str, &str), FeedError> {
        match (
            present(&self.config.client_id),
            present(&self.config.client_secret),
        ) {
            (Some(id), Some(secret)) => Ok((id, secret)),
            _ => Err(FeedError::config(
                SOURCE,
                "missing RAKUTEN_CLIENT_ID / RAKUTEN_CLIENT_SECRET",
            )),
        }
    }

    /// Return the cached token or acquire a new one.
    ///
    /// `expires_in` must be a finite positive number of seconds; anything
    /// else falls back to the configured default lifetime.
    async fn access_token(&self, client_id: &str, client_secret: &str) -> Result<String, FeedError> {
        if let Some(token) = self.tokens.current() {
            return Ok(token);
        }

        let basic = base64::engine::general_purpose::STANDARD
            .encode(format!("{client_id}:{client_secret}"));
        let response = self
            .client
            .post(format!("{}/token", self.base()))
            .header("Authorization", format!("Basic {basic}"))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| FeedError::auth(SOURCE, None, format!("token request failed: {e}")))?;

        let payload = http::read_json(SOURCE, response).await.map_err(|e| {
            FeedError::auth(SOURCE, e.http_status(), format!("token error: {}", e.message()))
        })?;

        let token = first_str(&payload, &["access_token"])
            .ok_or_else(|| FeedError::auth(SOURCE, None, "token response has no access_token"))?;
        let ttl = first_number(&payload, &["expires_in"])
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(|secs| Duration::from_secs_f64(secs.min(MAX_LIFETIME.as_secs_f64())))
            .unwrap_or_else(|| Duration::from_secs(self.config.default_token_ttl_seconds));

        tracing::debug!(ttl_secs = ttl.as_secs(), "Rakuten token acquired");
        self.tokens.store(token.clone(), ttl);
        Ok(token)
    }
}

#[async_trait]
impl FeedAdapter for RakutenFeed {
    fn source_id(&self) -> &str {
        FeedSource::Rakuten.id()
    }

    async fn search(&self, query: &str, page: u32) -> Result<Vec<Product>, FeedError> {
        let (client_id, client_secret) = self.credentials()?;
        let token = self.access_token(client_id, client_secret).await?;
        tracing::trace!(query, page, "Rakuten search");

        let page = page.to_string();
        let per_page = self.config.per_page.to_string();
        let response = self
            .client
            .get(format!("{}/productsearch/1.0", self.base()))
            .query(&[("keyword", query), ("max", &per_page), ("pagenumber", &page)])
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| http::transport_error(SOURCE, &e))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            self.tokens.invalidate();
            return Err(FeedError::auth(SOURCE, Some(401), "bearer token rejected"));
        }

        let payload = http::read_json(SOURCE, response).await?;
        parse_rakuten_json(&payload)
    }
}

/// Parse a Rakuten product search payload.
///
/// Items may be listed under `item`, `products` or `results`; a payload with
/// none of them is zero results.
pub fn parse_rakuten_json(payload: &Value) -> Result<Vec<Product>, FeedError> {
    if !payload.is_object() {
        return Err(FeedError::parse(SOURCE, "payload is not a JSON object"));
    }
    let items = first_array(payload, &["item", "products", "results"])
        .map(Vec::as_slice)
        .unwrap_or_default();

    let products = deduplicate(items.iter().map(parse_item).collect());
    tracing::debug!(count = products.len(), "Rakuten results parsed");
    Ok(products)
}

fn parse_item(item: &Value) -> Product {
    let url = first_str(item, &["productUrl", "linkUrl", "url"]);
    let id = first_str(item, &["sku", "advertiserProductId", "productId", "linkId"])
        .or_else(|| url.clone())
        .unwrap_or_default();

    // Zero prices are placeholders upstream; fall through to the next field.
    let price = ["price", "salePrice", "retailPrice"]
        .into_iter()
        .filter_map(|key| first_number(item, &[key]))
        .find(|p| *p != 0.0);

    Product {
        id,
        name: first_str(item, &["productName", "name", "title"]),
        brand: first_str(item, &["brandName", "brand"]),
        product_type: first_str(item, &["categoryName", "category"]),
        price,
        gender: Some(Gender::Unisex),
        image: first_str(item, &["imageUrl", "largeImage", "thumbnailImage"]),
        url,
        in_stock: Some(true),
        ..Default::default()
    }
}
