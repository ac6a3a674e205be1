//! End-to-end tests for the HTTP surface.
//!
//! Each test binds the router on an ephemeral local port and drives it with
//! a real HTTP client. Upstream feeds are either wiremock servers or left
//! unconfigured so that every feed fails.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use atelier::AppConfig;
use atelier::server::{ADVISORY_HEADER, AppState, SEQUENCE_HEADER, router};
use atelier_feeds::FeedSource;
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn spawn(config: AppConfig) -> String {
    let state = AppState::from_config(&config).unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    format!("http://{addr}")
}

/// Only Skimlinks, pointed at `server`.
fn skimlinks_config(server: &MockServer) -> AppConfig {
    let mut config = AppConfig::default();
    config.feeds.sources = vec![FeedSource::Skimlinks];
    config.feeds.skimlinks.api_key = Some("skim-key".into());
    config.feeds.skimlinks.base_url = server.uri();
    config
}

/// All feeds enabled but none credentialed, so every feed fails.
fn failing_config(fallback: bool) -> AppConfig {
    let mut config = AppConfig::default();
    config.server.fallback_to_samples = fallback;
    config
}

fn ids(products: &Value) -> Vec<String> {
    products
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn health_lists_feeds() {
    let base = spawn(AppConfig::default()).await;
    let body: Value = reqwest::get(format!("{base}/health")).await.unwrap().json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["feeds"], json!(["rakuten", "skimlinks", "amazon"]));
}

#[tokio::test]
async fn search_ranks_live_results_with_cache_header() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("query", "silk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "products": [
                {"productId": "low", "title": "Silk Scarf", "rating": 3.0, "availability": "in_stock"},
                {"productId": "high", "title": "Silk Blouse", "rating": 5.0, "availability": "in_stock"},
                {"productId": "other", "title": "Wool Coat"}
            ]
        })))
        .mount(&upstream)
        .await;

    let base = spawn(skimlinks_config(&upstream)).await;
    let response = reqwest::get(format!("{base}/search?query=silk")).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["cache-control"],
        "s-maxage=120, stale-while-revalidate=600"
    );
    assert!(response.headers().get(ADVISORY_HEADER).is_none());

    let body: Value = response.json().await.unwrap();
    assert_eq!(ids(&body), vec!["high", "low"]);
    assert!(body[0]["score"].as_f64().unwrap() > body[1]["score"].as_f64().unwrap());
}

#[tokio::test]
async fn search_applies_request_filters() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "products": [
                {"productId": "a", "title": "Linen Shirt", "price": 40, "materials": ["Linen"]},
                {"productId": "b", "title": "Linen Dress", "price": 140, "materials": ["Linen", "Silk"]},
                {"productId": "c", "title": "Linen Trousers", "price": 90, "materials": ["Linen", "Silk"]}
            ]
        })))
        .mount(&upstream)
        .await;

    let base = spawn(skimlinks_config(&upstream)).await;
    let body: Value = reqwest::get(format!(
        "{base}/search?query=linen&minPrice=50&maxPrice=150&materials=Linen,Silk&sort=price-desc"
    ))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();
    assert_eq!(ids(&body), vec!["b", "c"]);
}

#[tokio::test]
async fn total_failure_serves_ranked_samples_with_advisory() {
    let base = spawn(failing_config(true)).await;
    let response = reqwest::get(format!("{base}/search")).await.unwrap();
    assert_eq!(response.status(), 200);
    let advisory = response.headers()[ADVISORY_HEADER].to_str().unwrap().to_string();
    assert!(advisory.starts_with("all 3 feeds failed"));

    let body: Value = response.json().await.unwrap();
    assert_eq!(ids(&body), vec!["p2", "p1", "p3"]);
}

#[tokio::test]
async fn search_tickets_increase_per_request() {
    let base = spawn(failing_config(true)).await;
    let client = reqwest::Client::new();

    let mut tickets = Vec::new();
    for _ in 0..3 {
        let response = client.get(format!("{base}/search")).send().await.unwrap();
        let ticket: u64 = response.headers()[SEQUENCE_HEADER].to_str().unwrap().parse().unwrap();
        tickets.push(ticket);
    }
    assert_eq!(tickets, vec![1, 2, 3]);
}

#[tokio::test]
async fn total_failure_without_fallback_is_502() {
    let base = spawn(failing_config(false)).await;
    let response = reqwest::get(format!("{base}/search?query=silk")).await.unwrap();
    assert_eq!(response.status(), 502);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("feeds failed"));
}

#[tokio::test]
async fn invalid_sort_is_400() {
    let base = spawn(failing_config(true)).await;
    let response = reqwest::get(format!("{base}/search?sort=cheapest")).await.unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn single_feed_route_statuses() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&upstream)
        .await;

    let base = spawn(skimlinks_config(&upstream)).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{base}/feeds/skimlinks/search?query=silk"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 429);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("rate limited"));

    let response = client
        .get(format!("{base}/feeds/etsy/search?query=silk"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn single_feed_without_credentials_is_500() {
    let base = spawn(AppConfig::default()).await;
    let response = reqwest::get(format!("{base}/feeds/amazon/search?query=coat")).await.unwrap();
    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("amazon"));
}

#[tokio::test]
async fn single_feed_success_returns_products() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "products": [{"productId": "s1", "title": "Silk Tank", "price": {"amount": 60}}]
        })))
        .mount(&upstream)
        .await;

    let base = spawn(skimlinks_config(&upstream)).await;
    let response = reqwest::get(format!("{base}/feeds/skimlinks/search?query=silk&page=3"))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.headers().contains_key("cache-control"));
    let body: Value = response.json().await.unwrap();
    assert_eq!(body[0]["id"], "s1");
    assert_eq!(body[0]["price"], 60.0);
    assert!(body[0].get("score").is_none());
}

#[tokio::test]
async fn stored_preferences_shape_search() {
    let base = spawn(failing_config(true)).await;
    let client = reqwest::Client::new();

    let response = client
        .put(format!("{base}/prefs/shopper-1"))
        .json(&json!({"palette": "light-spring", "clothingSize": "S"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    let stored: Value = client
        .get(format!("{base}/prefs/shopper-1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stored["clothingSize"], "S");

    let body: Value = client
        .get(format!("{base}/search?user=shopper-1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ids(&body), vec!["p3"]);

    // A request parameter overrides the stored palette.
    let body: Value = client
        .get(format!("{base}/search?user=shopper-1&palette=soft-summer"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ids(&body), vec!["p2"]);
}

#[tokio::test]
async fn favorites_toggle_and_invalid_user() {
    let base = spawn(AppConfig::default()).await;
    let client = reqwest::Client::new();

    let added: Value = client
        .post(format!("{base}/prefs/shopper-2/favorites/p1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(added, json!(["p1"]));

    let removed: Value = client
        .post(format!("{base}/prefs/shopper-2/favorites/p1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(removed, json!([]));

    let toggles: Vec<_> = (0..8)
        .map(|i| {
            let client = client.clone();
            let url = format!("{base}/prefs/shopper-3/favorites/p{i}");
            tokio::spawn(async move { client.post(url).send().await.unwrap().status() })
        })
        .collect();
    for toggle in toggles {
        assert_eq!(toggle.await.unwrap(), 200);
    }
    let stored: Value = client
        .get(format!("{base}/prefs/shopper-3"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stored["favorites"].as_array().unwrap().len(), 8);

    let response = client
        .get(format!("{base}/prefs/bad.user"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let empty: Value = client
        .get(format!("{base}/prefs/nobody"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(empty, json!({}));
}
