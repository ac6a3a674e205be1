//! Built-in sample catalog.
//!
//! Served in place of live results when every feed fails and the caller
//! has opted into sample fallback.

use crate::types::{Gender, Product};

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

/// The three sample products, in catalog order.
pub fn sample_products() -> Vec<Product> {
    vec![
        Product {
            id: "p1".into(),
            name: Some("Silk Button Down Blouse".into()),
            brand: Some("Éclat".into()),
            product_type: Some("Tops".into()),
            price: Some(145.0),
            gender: Some(Gender::Female),
            sizes: strings(&["XS", "S", "M", "L"]),
            palette: Some("cool-winter".into()),
            body: strings(&["hourglass", "rectangle"]),
            materials: strings(&["Silk"]),
            image: Some(
                "https://images.unsplash.com/photo-1512436991641-6745cdb1723f?q=80&w=1200&auto=format&fit=crop"
                    .into(),
            ),
            url: Some("https://example.com/product/silk-button-down".into()),
            rating: Some(4.6),
            in_stock: Some(true),
            score: None,
        },
        Product {
            id: "p2".into(),
            name: Some("High-Rise Wide-Leg Trousers".into()),
            brand: Some("Forma".into()),
            product_type: Some("Pants".into()),
            price: Some(98.0),
            gender: Some(Gender::Female),
            sizes: strings(&["24", "25", "26", "27", "28", "29", "30"]),
            palette: Some("soft-summer".into()),
            body: strings(&["pear", "hourglass"]),
            materials: strings(&["Linen", "Cotton"]),
            image: Some(
                "https://images.unsplash.com/photo-1520975916090-3105956dac38?q=80&w=1200&auto=format&fit=crop"
                    .into(),
            ),
            url: Some("https://example.com/product/wide-leg-trousers".into()),
            rating: Some(4.7),
            in_stock: Some(true),
            score: None,
        },
        Product {
            id: "p3".into(),
            name: Some("Halter Top Knit Tank".into()),
            brand: Some("Arcadia".into()),
            product_type: Some("Tops".into()),
            price: Some(48.0),
            gender: Some(Gender::Female),
            sizes: strings(&["XS", "S", "M"]),
            palette: Some("light-spring".into()),
            body: strings(&["rectangle", "inverted-triangle"]),
            materials: strings(&["Cotton", "Viscose"]),
            image: Some(
                "https://images.unsplash.com/photo-1490481651871-ab68de25d43d?q=80&w=1200&auto=format&fit=crop"
                    .into(),
            ),
            url: Some("https://example.com/product/halter-top".into()),
            rating: Some(4.2),
            in_stock: Some(true),
            score: None,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::deduplicate;

    #[test]
    fn samples_have_unique_keys() {
        let samples = sample_products();
        assert_eq!(deduplicate(samples.clone()), samples);
    }

    #[test]
    fn samples_carry_no_score() {
        assert!(sample_products().iter().all(|p| p.score.is_none()));
    }
}
