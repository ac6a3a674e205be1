//! Ranking engine: filter, score, sort.
//!
//! [`rank`] is pure and synchronous. It never mutates its input; scores are
//! attached to the returned copies.

pub mod filter;
pub mod scoring;

use std::cmp::Ordering;

use crate::types::{Product, QueryContext, SortMode};

pub use scoring::tokenize;

/// Filter, score and sort `records` against `ctx`.
///
/// # Pipeline
///
/// 1. Drop records failing any preference filter
/// 2. Drop records not matching every query token
/// 3. Attach `3 * strength + stock + rating / 5` as the score
/// 4. Stable sort by `ctx.sort`; ties keep post-filter order
///
/// # Panics
///
/// Panics if either price bound in `ctx` is NaN. Use
/// [`QueryContext::validate`] to check a context first.
pub fn rank(records: &[Product], ctx: &QueryContext) -> Vec<Product> {
    if let Err(reason) = ctx.validate() {
        panic!("invalid query context: {reason}");
    }

    let tokens = tokenize(&ctx.query);
    let mut ranked: Vec<Product> = records
        .iter()
        .filter(|product| filter::passes(product, ctx))
        .filter_map(|product| {
            let strength = scoring::match_strength(product, &tokens)?;
            let mut scored = product.clone();
            scored.score = Some(scoring::score(product, strength));
            Some(scored)
        })
        .collect();

    sort_products(&mut ranked, ctx.sort);
    tracing::debug!(
        input = records.len(),
        output = ranked.len(),
        sort = %ctx.sort,
        "ranked products"
    );
    ranked
}

/// Stable sort by `mode`. Absent prices, ratings and scores count as 0.
pub fn sort_products(products: &mut [Product], mode: SortMode) {
    let key = |value: Option<f64>| value.unwrap_or(0.0);
    match mode {
        SortMode::PriceAsc => products.sort_by(|a, b| key(a.price).total_cmp(&key(b.price))),
        SortMode::PriceDesc => products.sort_by(|a, b| key(b.price).total_cmp(&key(a.price))),
        SortMode::Rating => products.sort_by(|a, b| key(b.rating).total_cmp(&key(a.rating))),
        SortMode::Relevance => products.sort_by(|a, b| descending(a.score, b.score)),
    }
}

fn descending(a: Option<f64>, b: Option<f64>) -> Ordering {
    b.unwrap_or(0.0).total_cmp(&a.unwrap_or(0.0))
}
