//! Product deduplication by id/url key.
//!
//! The first record seen for a key wins; later records with the same key
//! are dropped whole, never merged field by field. Records without a key
//! are discarded. Output order is the input order of the survivors, so
//! running this twice is a no-op.

use std::collections::HashSet;

use crate::types::Product;

/// Deduplicate products by [`Product::dedup_key`], keeping the first.
pub fn deduplicate(products: Vec<Product>) -> Vec<Product> {
    let mut seen: HashSet<String> = HashSet::with_capacity(products.len());
    let mut kept = Vec::with_capacity(products.len());
    let mut keyless = 0usize;

    for product in products {
        let Some(key) = product.dedup_key() else {
            keyless += 1;
            continue;
        };
        if seen.insert(key.to_owned()) {
            kept.push(product);
        }
    }

    if keyless > 0 {
        tracing::debug!(keyless, "dropped products without id or url");
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, url: Option<&str>, name: &str) -> Product {
        Product {
            id: id.to_string(),
            url: url.map(str::to_string),
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn unique_keys_pass_through_in_order() {
        let out = deduplicate(vec![product("a", None, "A"), product("b", None, "B")]);
        let ids: Vec<&str> = out.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn first_record_wins_on_collision() {
        let out = deduplicate(vec![
            product("p1", None, "first"),
            product("p2", None, "other"),
            product("p1", None, "second"),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].name.as_deref(), Some("first"));
    }

    #[test]
    fn url_is_fallback_key() {
        let out = deduplicate(vec![
            product("", Some("https://shop.example/x"), "first"),
            product("", Some("https://shop.example/x"), "second"),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name.as_deref(), Some("first"));
    }

    #[test]
    fn id_and_url_keys_share_one_namespace() {
        // A record whose id equals another record's url-derived key collides.
        let out = deduplicate(vec![
            product("https://shop.example/x", None, "by id"),
            product("", Some("https://shop.example/x"), "by url"),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name.as_deref(), Some("by id"));
    }

    #[test]
    fn keyless_records_discarded() {
        let out = deduplicate(vec![product("", None, "ghost"), product("", Some(""), "ghost 2")]);
        assert!(out.is_empty());
    }

    #[test]
    fn dedup_is_idempotent() {
        let input = vec![
            product("a", None, "A"),
            product("a", None, "A2"),
            product("", Some("https://u"), "U"),
            product("b", None, "B"),
        ];
        let once = deduplicate(input);
        let twice = deduplicate(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_input_returns_empty() {
        assert!(deduplicate(vec![]).is_empty());
    }
}
