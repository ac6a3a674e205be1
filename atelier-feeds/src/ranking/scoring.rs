//! Relevance scoring.
//!
//! ```text
//! score = 3 * match_strength + stock_term + rating / 5
//! stock_term = +1 if in stock, -2 otherwise (unknown counts as out)
//! ```
//!
//! The score is not clamped; an absent rating contributes 0.

use crate::types::Product;

/// Weight of each matched query token.
pub const TOKEN_WEIGHT: f64 = 3.0;
/// Bonus for a product known to be in stock.
pub const IN_STOCK_BONUS: f64 = 1.0;
/// Penalty for a product out of stock or with unknown stock.
pub const OUT_OF_STOCK_PENALTY: f64 = -2.0;

/// Split a query into lowercased whitespace tokens.
pub fn tokenize(query: &str) -> Vec<String> {
    query.split_whitespace().map(str::to_lowercase).collect()
}

/// Number of matched tokens, or `None` if any token is missing.
///
/// Tokens are matched as substrings of the lowercased `name brand type`
/// haystack. No tokens always matches with strength 0.
pub fn match_strength(product: &Product, tokens: &[String]) -> Option<usize> {
    if tokens.is_empty() {
        return Some(0);
    }
    let haystack = [
        product.name.as_deref(),
        product.brand.as_deref(),
        product.product_type.as_deref(),
    ]
    .map(Option::unwrap_or_default)
    .join(" ")
    .to_lowercase();

    tokens
        .iter()
        .all(|token| haystack.contains(token.as_str()))
        .then_some(tokens.len())
}

/// Score a product that matched with `strength` tokens.
pub fn score(product: &Product, strength: usize) -> f64 {
    let stock = if product.in_stock == Some(true) {
        IN_STOCK_BONUS
    } else {
        OUT_OF_STOCK_PENALTY
    };
    TOKEN_WEIGHT * strength as f64 + stock + product.rating.unwrap_or(0.0) / 5.0
}
