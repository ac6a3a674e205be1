//! Core types: the canonical product record, feed identification and the
//! query context consumed by the ranking engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Gender a product is cut for. A record without a gender is unrestricted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Female,
    Male,
    Unisex,
}

impl Gender {
    /// Lenient parse used by feed adapters and query strings.
    ///
    /// Accepts any casing plus the common `women`/`men` spellings. Returns
    /// `None` for anything unrecognised.
    pub fn parse_loose(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "female" | "women" | "womens" | "woman" => Some(Self::Female),
            "male" | "men" | "mens" | "man" => Some(Self::Male),
            "unisex" => Some(Self::Unisex),
            _ => None,
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Female => "Female",
            Self::Male => "Male",
            Self::Unisex => "Unisex",
        })
    }
}

/// A product listing normalised from any upstream feed.
///
/// Adapters guarantee that [`Product::dedup_key`] is `Some` for every
/// record they return. `score` is never provided upstream; the ranking
/// engine attaches it to the copies it returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    /// Amount in the upstream's native currency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub sizes: Vec<String>,
    /// Colour palette taxonomy id, e.g. `cool-winter`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub palette: Option<String>,
    /// Body-type taxonomy ids the cut suits, e.g. `hourglass`.
    #[serde(default)]
    pub body: Vec<String>,
    #[serde(default)]
    pub materials: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// 0–5 scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_stock: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Product {
    /// The deduplication key: `id`, falling back to `url`.
    ///
    /// Returns `None` when both are empty; such records are discarded
    /// before any merge.
    pub fn dedup_key(&self) -> Option<&str> {
        let id = self.id.trim();
        if !id.is_empty() {
            return Some(id);
        }
        self.url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }
}

/// How ranked results are ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortMode {
    /// Score descending.
    #[default]
    Relevance,
    PriceAsc,
    PriceDesc,
    /// Rating descending.
    Rating,
}

impl SortMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::PriceAsc => "price-asc",
            Self::PriceDesc => "price-desc",
            Self::Rating => "rating",
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "relevance" => Ok(Self::Relevance),
            "price-asc" => Ok(Self::PriceAsc),
            "price-desc" => Ok(Self::PriceDesc),
            "rating" => Ok(Self::Rating),
            other => Err(format!("unknown sort mode: {other}")),
        }
    }
}

/// Inclusive price bounds. The two ends may be given in either order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRange {
    pub low: f64,
    pub high: f64,
}

impl PriceRange {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// A range that admits every price.
    pub fn unbounded() -> Self {
        Self {
            low: f64::NEG_INFINITY,
            high: f64::INFINITY,
        }
    }

    /// Normalised `(min, max)` bounds.
    pub fn bounds(&self) -> (f64, f64) {
        (self.low.min(self.high), self.low.max(self.high))
    }

    pub fn contains(&self, price: f64) -> bool {
        let (lo, hi) = self.bounds();
        price >= lo && price <= hi
    }

    fn is_well_formed(&self) -> bool {
        !self.low.is_nan() && !self.high.is_nan()
    }
}

impl Default for PriceRange {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// The ephemeral input to one ranking pass.
///
/// Every optional preference left as `None` (or an empty material list)
/// means "unset" and never excludes a record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryContext {
    pub query: String,
    pub price: PriceRange,
    pub gender: Option<Gender>,
    pub palette: Option<String>,
    pub body: Option<String>,
    /// All listed materials must be present (AND semantics).
    pub materials: Vec<String>,
    pub sort: SortMode,
}

impl QueryContext {
    /// A context with only free text and default preferences.
    pub fn for_query(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Checks the caller contract the ranking engine relies on.
    pub fn validate(&self) -> Result<(), String> {
        if !self.price.is_well_formed() {
            return Err("price bounds must not be NaN".into());
        }
        Ok(())
    }
}

/// The upstream commerce feeds this crate ships adapters for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSource {
    /// Rakuten Advertising product search, OAuth client-credentials token.
    Rakuten,
    /// Skimlinks product API, static bearer key.
    Skimlinks,
    /// Amazon Product Advertising API 5, signed requests.
    Amazon,
}

impl FeedSource {
    /// Stable identifier used in errors, logs and routes.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Rakuten => "rakuten",
            Self::Skimlinks => "skimlinks",
            Self::Amazon => "amazon",
        }
    }

    /// All feeds in default declaration order.
    pub fn all() -> &'static [FeedSource] {
        &[Self::Rakuten, Self::Skimlinks, Self::Amazon]
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::all().iter().copied().find(|s| s.id() == id)
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_key_prefers_id() {
        let p = Product {
            id: "p1".into(),
            url: Some("https://example.com/p1".into()),
            ..Default::default()
        };
        assert_eq!(p.dedup_key(), Some("p1"));
    }

    #[test]
    fn dedup_key_falls_back_to_url() {
        let p = Product {
            id: "  ".into(),
            url: Some("https://example.com/p1".into()),
            ..Default::default()
        };
        assert_eq!(p.dedup_key(), Some("https://example.com/p1"));
    }

    #[test]
    fn dedup_key_none_without_id_or_url() {
        let p = Product {
            url: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(p.dedup_key(), None);
    }

    #[test]
    fn product_serializes_camel_case_and_type() {
        let p = Product {
            id: "p1".into(),
            product_type: Some("Tops".into()),
            in_stock: Some(true),
            ..Default::default()
        };
        let json = serde_json::to_value(&p).expect("serialize");
        assert_eq!(json["type"], "Tops");
        assert_eq!(json["inStock"], true);
        assert!(json.get("score").is_none());
        assert!(json.get("price").is_none());
    }

    #[test]
    fn product_deserializes_with_missing_fields() {
        let p: Product = serde_json::from_str(r#"{"id":"x","gender":"Female"}"#).expect("parse");
        assert_eq!(p.gender, Some(Gender::Female));
        assert!(p.materials.is_empty());
        assert!(p.price.is_none());
    }

    #[test]
    fn gender_parse_loose() {
        assert_eq!(Gender::parse_loose("FEMALE"), Some(Gender::Female));
        assert_eq!(Gender::parse_loose("men"), Some(Gender::Male));
        assert_eq!(Gender::parse_loose(" Unisex "), Some(Gender::Unisex));
        assert_eq!(Gender::parse_loose("kids"), None);
    }

    #[test]
    fn sort_mode_parse_and_display() {
        for mode in [
            SortMode::Relevance,
            SortMode::PriceAsc,
            SortMode::PriceDesc,
            SortMode::Rating,
        ] {
            assert_eq!(mode.to_string().parse::<SortMode>(), Ok(mode));
        }
        assert_eq!("".parse::<SortMode>(), Ok(SortMode::Relevance));
        assert!("newest".parse::<SortMode>().is_err());
    }

    #[test]
    fn sort_mode_serde_kebab_case() {
        let json = serde_json::to_string(&SortMode::PriceDesc).expect("serialize");
        assert_eq!(json, "\"price-desc\"");
    }

    #[test]
    fn price_range_normalises_reversed_bounds() {
        let range = PriceRange::new(200.0, 50.0);
        assert_eq!(range.bounds(), (50.0, 200.0));
        assert!(range.contains(50.0));
        assert!(range.contains(200.0));
        assert!(!range.contains(200.01));
    }

    #[test]
    fn unbounded_range_contains_everything() {
        let range = PriceRange::default();
        assert!(range.contains(0.0));
        assert!(range.contains(1e12));
    }

    #[test]
    fn query_context_validate_rejects_nan() {
        let mut ctx = QueryContext::for_query("silk");
        assert!(ctx.validate().is_ok());
        ctx.price = PriceRange::new(f64::NAN, 10.0);
        assert!(ctx.validate().is_err());
    }

    #[test]
    fn feed_source_ids_round_trip() {
        for source in FeedSource::all() {
            assert_eq!(FeedSource::from_id(source.id()), Some(*source));
        }
        assert_eq!(FeedSource::from_id("ebay"), None);
        assert_eq!(FeedSource::all()[0], FeedSource::Rakuten);
    }
}
