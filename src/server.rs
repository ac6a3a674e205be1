//! HTTP surface: per-feed search, aggregate search, preferences.

use std::sync::Arc;

use atelier_feeds::catalog::sample_products;
use atelier_feeds::{
    Aggregator, FeedError, Gender, PriceRange, Product, QueryContext, SearchSequence, rank,
};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::AppConfig;
use crate::error::AppError;
use crate::prefs::{PreferenceStore, Preferences, SharedPreferences, open_store};

/// Header carrying the advisory when sample products stand in for live ones.
pub const ADVISORY_HEADER: &str = "x-feed-advisory";

/// Header carrying the search ticket. Clients drop any response whose
/// ticket is lower than one they have already rendered.
pub const SEQUENCE_HEADER: &str = "x-search-seq";

/// Shared state behind every route.
#[derive(Clone)]
pub struct AppState {
    aggregator: Arc<Aggregator>,
    prefs: Arc<SharedPreferences>,
    sequence: Arc<SearchSequence>,
    fallback_to_samples: bool,
    cache_control: HeaderValue,
}

impl AppState {
    pub fn new(
        aggregator: Aggregator,
        prefs: Box<dyn PreferenceStore>,
        config: &AppConfig,
    ) -> Self {
        let cache_control = HeaderValue::from_str(&config.cache_control())
            .unwrap_or_else(|_| HeaderValue::from_static("no-store"));
        Self {
            aggregator: Arc::new(aggregator),
            prefs: Arc::new(SharedPreferences::new(prefs)),
            sequence: Arc::new(SearchSequence::new()),
            fallback_to_samples: config.server.fallback_to_samples,
            cache_control,
        }
    }

    /// Build the aggregator and preference store described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the feed configuration is invalid.
    pub fn from_config(config: &AppConfig) -> crate::error::Result<Self> {
        let aggregator = Aggregator::from_config(&config.feeds)?;
        Ok(Self::new(aggregator, open_store(&config.prefs), config))
    }
}

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/search", get(search))
        .route("/feeds/{source}/search", get(feed_search))
        .route("/prefs/{user}", get(get_prefs).put(put_prefs))
        .route("/prefs/{user}/favorites/{product_id}", post(favorite))
        .with_state(state)
}

/// Bind the configured address and serve until the process exits.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the listener cannot
/// be bound.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let state = AppState::from_config(&config)?;
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(
        feeds = ?config.feeds.sources,
        prefs = ?config.prefs.backend,
        "atelier listening on http://{local_addr}"
    );
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// A JSON `{ "error": ... }` response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        let status = match err {
            AppError::InvalidUser(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %err, "request failed");
        }
        Self::new(status, err.to_string())
    }
}

/// Status for a failed single-feed call: the upstream status when known,
/// 500 for missing configuration, 502 otherwise.
fn feed_error_status(err: &FeedError) -> StatusCode {
    if matches!(err, FeedError::Config { .. }) {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    err.http_status()
        .and_then(|code| StatusCode::from_u16(code).ok())
        .filter(|status| status.is_client_error() || status.is_server_error())
        .unwrap_or(StatusCode::BAD_GATEWAY)
}

/// Header-safe rendering of an advisory message.
fn advisory_value(text: &str) -> HeaderValue {
    let cleaned: String = text
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '?' })
        .take(200)
        .collect();
    HeaderValue::from_str(&cleaned).unwrap_or_else(|_| HeaderValue::from_static("all feeds failed"))
}

fn products_response(
    products: Vec<Product>,
    mut headers: HeaderMap,
    cache_control: &HeaderValue,
) -> Response {
    headers.insert(header::CACHE_CONTROL, cache_control.clone());
    (headers, Json(products)).into_response()
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let feeds: Vec<&str> = state.aggregator.adapters().iter().map(|a| a.source_id()).collect();
    Json(json!({
        "status": "ok",
        "feeds": feeds,
    }))
}

#[derive(Debug, Deserialize)]
struct FeedQuery {
    #[serde(default)]
    query: String,
    page: Option<u32>,
}

async fn feed_search(
    State(state): State<AppState>,
    Path(source): Path<String>,
    Query(params): Query<FeedQuery>,
) -> Result<Response, ApiError> {
    let page = params.page.unwrap_or(1).max(1);
    let Some(result) = state
        .aggregator
        .search_one(&source, &params.query, page)
        .await
    else {
        return Err(ApiError::new(
            StatusCode::NOT_FOUND,
            format!("unknown feed source: {source}"),
        ));
    };

    match result {
        Ok(products) => Ok(products_response(products, HeaderMap::new(), &state.cache_control)),
        Err(err) => {
            tracing::warn!(source = %source, error = %err, "feed search failed");
            Err(ApiError::new(feed_error_status(&err), err.to_string()))
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchParams {
    #[serde(default)]
    query: String,
    page: Option<u32>,
    min_price: Option<f64>,
    max_price: Option<f64>,
    gender: Option<String>,
    palette: Option<String>,
    body: Option<String>,
    /// Comma-separated.
    materials: Option<String>,
    sort: Option<String>,
    user: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Merge request parameters over the user's stored preferences.
fn build_context(params: &SearchParams, stored: Option<Preferences>) -> Result<QueryContext, ApiError> {
    let mut ctx = match stored {
        Some(prefs) => prefs.query_context(params.query.clone()),
        None => QueryContext::for_query(params.query.clone()),
    };

    if params.min_price.is_some() || params.max_price.is_some() {
        let (low, high) = ctx.price.bounds();
        ctx.price = PriceRange::new(
            params.min_price.unwrap_or(low),
            params.max_price.unwrap_or(high),
        );
    }
    if let Some(raw) = non_empty(&params.gender) {
        let gender = Gender::parse_loose(raw)
            .ok_or_else(|| ApiError::bad_request(format!("unknown gender: {raw}")))?;
        ctx.gender = Some(gender);
    }
    if let Some(palette) = non_empty(&params.palette) {
        ctx.palette = Some(palette.to_owned());
    }
    if let Some(body) = non_empty(&params.body) {
        ctx.body = Some(body.to_owned());
    }
    if let Some(raw) = non_empty(&params.materials) {
        ctx.materials = raw
            .split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_owned)
            .collect();
    }
    if let Some(raw) = non_empty(&params.sort) {
        ctx.sort = raw.parse().map_err(ApiError::bad_request)?;
    }

    ctx.validate().map_err(ApiError::bad_request)?;
    Ok(ctx)
}

async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Response, ApiError> {
    let stored = match non_empty(&params.user) {
        Some(user) => state.prefs.load(user).await?.map(|blob| Preferences::from_blob(&blob)),
        None => None,
    };
    let ctx = build_context(&params, stored)?;
    let page = params.page.unwrap_or(1).max(1);
    let ticket = state.sequence.next();
    tracing::trace!(query = %ctx.query, page, ticket, "search request");

    let outcome = atelier_feeds::search(&state.aggregator, &ctx, page).await;
    if !state.sequence.is_latest(ticket) {
        tracing::debug!(ticket, "search superseded by a newer request");
    }
    if outcome.is_degraded() {
        tracing::debug!(
            failed = outcome.failures.len(),
            cache = ?outcome.cache,
            "serving partial aggregate"
        );
    }

    let mut headers = HeaderMap::new();
    headers.insert(HeaderName::from_static(SEQUENCE_HEADER), HeaderValue::from(ticket));
    let Some(advisory) = outcome.advisory else {
        return Ok(products_response(outcome.products, headers, &state.cache_control));
    };

    if !state.fallback_to_samples {
        return Err(ApiError::new(StatusCode::BAD_GATEWAY, advisory.to_string()));
    }

    tracing::warn!(advisory = %advisory, "serving sample catalog");
    headers.insert(
        HeaderName::from_static(ADVISORY_HEADER),
        advisory_value(&advisory.to_string()),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    Ok((headers, Json(rank(&sample_products(), &ctx))).into_response())
}

async fn get_prefs(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let blob = state.prefs.load(&user).await?.unwrap_or_else(|| json!({}));
    Ok(Json(blob))
}

async fn put_prefs(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Json(blob): Json<Value>,
) -> Result<StatusCode, ApiError> {
    state.prefs.save(&user, &blob).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn favorite(
    State(state): State<AppState>,
    Path((user, product_id)): Path<(String, String)>,
) -> Result<Json<Vec<String>>, ApiError> {
    let favorites = state.prefs.toggle_favorite(&user, &product_id).await?;
    Ok(Json(favorites))
}
