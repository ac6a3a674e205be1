//! Amazon Product Advertising API 5: signed `SearchItems` requests.
//!
//! Requests are authenticated with the canonical-request signer in
//! [`crate::signing`]; the signed header set is sent verbatim.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::adapter::FeedAdapter;
use crate::aggregate::dedup::deduplicate;
use crate::config::AmazonConfig;
use crate::error::FeedError;
use crate::http;
use crate::signing::{Clock, RequestSigner, SignableRequest, SystemClock};
use crate::types::{FeedSource, Gender, Product};

use super::fields::{contains_marker, number_at, str_at};

const SOURCE: &str = "amazon";

pub const SERVICE: &str = "ProductAdvertisingAPI";
pub const SEARCH_PATH: &str = "/paapi5/searchitems";
pub const SEARCH_TARGET: &str = "com.amazon.paapi5.v1.ProductAdvertisingAPIv1.SearchItems";

const IN_STOCK_MARKER: &str = "in stock";

const RESOURCES: &[&str] = &[
    "Images.Primary.Large",
    "ItemInfo.Title",
    "ItemInfo.ByLineInfo",
    "Offers.Listings.Price",
    "Offers.Listings.Availability",
    "BrowseNodeInfo.BrowseNodes",
];

/// Amazon PA-API 5 adapter.
pub struct AmazonFeed {
    config: AmazonConfig,
    client: reqwest::Client,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for AmazonFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmazonFeed")
            .field("host", &self.config.host)
            .field("region", &self.config.region)
            .finish_non_exhaustive()
    }
}

impl AmazonFeed {
    pub fn new(config: AmazonConfig, client: reqwest::Client) -> Self {
        Self {
            config,
            client,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the signer's timestamp source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn signer(&self) -> Result<RequestSigner, FeedError> {
        let access = self.config.access_key.as_deref().unwrap_or_default();
        let secret = self.config.secret_key.as_deref().unwrap_or_default();
        RequestSigner::new(access, secret, &self.config.region, SERVICE)
            .map(|signer| signer.with_clock(Arc::clone(&self.clock)))
            .map_err(|e| FeedError::config(SOURCE, format!("AMAZON_PAAPI_*: {e}")))
    }

    fn partner_tag(&self) -> Result<&str, FeedError> {
        self.config
            .partner_tag
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| FeedError::config(SOURCE, "missing AMAZON_PAAPI_PARTNER_TAG"))
    }
}

/// Build the `SearchItems` request body.
pub fn build_search_body(
    query: &str,
    page: u32,
    partner_tag: &str,
    config: &AmazonConfig,
) -> Value {
    json!({
        "Keywords": query,
        "PartnerTag": partner_tag,
        "PartnerType": "Associates",
        "Marketplace": config.marketplace,
        "ItemCount": config.item_count,
        "ItemPage": page,
        "Resources": RESOURCES,
    })
}

#[async_trait]
impl FeedAdapter for AmazonFeed {
    fn source_id(&self) -> &str {
        FeedSource::Amazon.id()
    }

    async fn search(&self, query: &str, page: u32) -> Result<Vec<Product>, FeedError> {
        let signer = self.signer()?;
        let partner_tag = self.partner_tag()?;
        tracing::trace!(query, page, "Amazon search");

        let body = build_search_body(query, page, partner_tag, &self.config).to_string();
        let headers = signer.sign(&SignableRequest {
            method: "POST",
            path: SEARCH_PATH,
            host: &self.config.host,
            headers: &[("x-amz-target", SEARCH_TARGET)],
            body: body.as_bytes(),
        });

        let url = format!(
            "{}{SEARCH_PATH}",
            self.config.endpoint_base().trim_end_matches('/')
        );
        let mut request = self.client.post(url);
        for (name, value) in &headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| http::transport_error(SOURCE, &e))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            let text = response.text().await.unwrap_or_default();
            return Err(FeedError::auth(
                SOURCE,
                Some(status.as_u16()),
                format!("signature rejected: {}", text.trim()),
            ));
        }

        let payload = http::read_json(SOURCE, response).await?;
        parse_amazon_json(&payload)
    }
}

/// Parse a PA-API `SearchItems` response.
///
/// A response without `SearchResult.Items` (PA-API's "no results" shape)
/// is zero results.
pub fn parse_amazon_json(payload: &Value) -> Result<Vec<Product>, FeedError> {
    if !payload.is_object() {
        return Err(FeedError::parse(SOURCE, "payload is not a JSON object"));
    }
    let items = payload
        .pointer("/SearchResult/Items")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let products = deduplicate(items.iter().map(parse_item).collect());
    tracing::debug!(count = products.len(), "Amazon results parsed");
    Ok(products)
}

fn parse_item(item: &Value) -> Product {
    let url = str_at(item, "/DetailPageURL");
    let id = str_at(item, "/ASIN")
        .or_else(|| url.clone())
        .unwrap_or_default();

    let in_stock = str_at(item, "/Offers/Listings/0/Availability/Message")
        .map(|message| contains_marker(&message, IN_STOCK_MARKER))
        .unwrap_or(false);

    Product {
        id,
        name: str_at(item, "/ItemInfo/Title/DisplayValue"),
        brand: str_at(item, "/ItemInfo/ByLineInfo/Brand/DisplayValue"),
        product_type: str_at(item, "/BrowseNodeInfo/BrowseNodes/0/DisplayName"),
        price: number_at(item, "/Offers/Listings/0/Price/Amount"),
        gender: Some(Gender::Unisex),
        image: str_at(item, "/Images/Primary/Large/URL"),
        url,
        in_stock: Some(in_stock),
        ..Default::default()
    }
}
