//! Preference filters applied before scoring.
//!
//! Every filter is a pass-through when its preference is unset; a record
//! survives only if it passes all of them.

use crate::types::{Gender, Product, QueryContext};

/// `true` if `product` passes every preference filter in `ctx`.
pub fn passes(product: &Product, ctx: &QueryContext) -> bool {
    price_ok(product, ctx)
        && gender_ok(product, ctx)
        && palette_ok(product, ctx)
        && body_ok(product, ctx)
        && materials_ok(product, ctx)
}

/// Inclusive range check. A product without a price is not excluded.
fn price_ok(product: &Product, ctx: &QueryContext) -> bool {
    product.price.is_none_or(|price| ctx.price.contains(price))
}

fn gender_ok(product: &Product, ctx: &QueryContext) -> bool {
    match (ctx.gender, product.gender) {
        (None, _) | (_, None) | (_, Some(Gender::Unisex)) => true,
        (Some(wanted), Some(actual)) => wanted == actual,
    }
}

fn palette_ok(product: &Product, ctx: &QueryContext) -> bool {
    ctx.palette
        .as_deref()
        .is_none_or(|wanted| product.palette.as_deref() == Some(wanted))
}

fn body_ok(product: &Product, ctx: &QueryContext) -> bool {
    ctx.body
        .as_deref()
        .is_none_or(|wanted| product.body.iter().any(|b| b == wanted))
}

fn materials_ok(product: &Product, ctx: &QueryContext) -> bool {
    ctx.materials
        .iter()
        .all(|wanted| product.materials.iter().any(|m| m == wanted))
}
