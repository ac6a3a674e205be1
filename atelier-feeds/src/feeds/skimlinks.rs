//! Skimlinks product API: static bearer key.

use async_trait::async_trait;
use serde_json::Value;

use crate::adapter::FeedAdapter;
use crate::aggregate::dedup::deduplicate;
use crate::config::SkimlinksConfig;
use crate::error::FeedError;
use crate::http;
use crate::types::{FeedSource, Gender, Product};

use super::fields::{contains_marker, first_number, first_str, number_at, str_at, string_list};

const SOURCE: &str = "skimlinks";

/// Skimlinks availability strings look like `in_stock` / `out_of_stock`.
const IN_STOCK_MARKER: &str = "in_stock";

/// Skimlinks product search adapter.
pub struct SkimlinksFeed {
    config: SkimlinksConfig,
    client: reqwest::Client,
}

impl std::fmt::Debug for SkimlinksFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkimlinksFeed")
            .field("base_url", &self.config.base_url)
            .field("has_key", &self.config.api_key.is_some())
            .finish()
    }
}

impl SkimlinksFeed {
    pub fn new(config: SkimlinksConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    fn api_key(&self) -> Result<&str, FeedError> {
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| FeedError::config(SOURCE, "missing SKIMLINKS_PRODUCT_API_KEY"))
    }
}

#[async_trait]
impl FeedAdapter for SkimlinksFeed {
    fn source_id(&self) -> &str {
        FeedSource::Skimlinks.id()
    }

    async fn search(&self, query: &str, page: u32) -> Result<Vec<Product>, FeedError> {
        let key = self.api_key()?;
        tracing::trace!(query, page, "Skimlinks search");

        let url = format!("{}/search", self.config.base_url.trim_end_matches('/'));
        let page = page.to_string();
        let per_page = self.config.per_page.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[("query", query), ("page", &page), ("per_page", &per_page)])
            .bearer_auth(key)
            .send()
            .await
            .map_err(|e| http::transport_error(SOURCE, &e))?;

        let payload = http::read_json(SOURCE, response).await?;
        parse_skimlinks_json(&payload)
    }
}

/// Parse a Skimlinks search payload into products.
///
/// A payload without a `products` array is treated as zero results.
pub fn parse_skimlinks_json(payload: &Value) -> Result<Vec<Product>, FeedError> {
    if !payload.is_object() {
        return Err(FeedError::parse(SOURCE, "payload is not a JSON object"));
    }
    let items = payload
        .get("products")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let products: Vec<Product> = items.iter().map(parse_item).collect();
    let products = deduplicate(products);
    tracing::debug!(count = products.len(), "Skimlinks results parsed");
    Ok(products)
}

fn parse_item(item: &Value) -> Product {
    let url = first_str(item, &["url"]);
    let id = first_str(item, &["productId", "id", "sku"])
        .or_else(|| url.clone())
        .unwrap_or_default();

    let price = number_at(item, "/price/amount").or_else(|| first_number(item, &["price"]));

    let gender = first_str(item, &["gender"])
        .map(|g| Gender::parse_loose(&g))
        .unwrap_or(Some(Gender::Unisex));

    let product_type = item
        .get("categoryPath")
        .and_then(Value::as_array)
        .and_then(|path| path.last())
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned);

    let image = str_at(item, "/images/0/url").or_else(|| first_str(item, &["imageUrl"]));

    let in_stock = first_str(item, &["availability"])
        .map(|text| contains_marker(&text, IN_STOCK_MARKER))
        .unwrap_or(true);

    Product {
        id,
        name: first_str(item, &["title"]),
        brand: first_str(item, &["brand"]),
        product_type,
        price,
        gender,
        materials: string_list(item, "materials"),
        image,
        url,
        rating: first_number(item, &["rating"]),
        in_stock: Some(in_stock),
        ..Default::default()
    }
}
