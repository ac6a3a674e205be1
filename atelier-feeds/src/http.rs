//! Shared HTTP client construction and response helpers for feed adapters.

use std::time::Duration;

use crate::error::FeedError;

/// User-Agent sent to every upstream feed.
pub const USER_AGENT: &str = concat!("atelier-feeds/", env!("CARGO_PKG_VERSION"));

/// Build a [`reqwest::Client`] for one feed adapter.
///
/// The client has:
/// - Request timeout from config, so a hung upstream settles as an error
/// - A fixed, identifying User-Agent
/// - gzip decompression
///
/// # Errors
///
/// Returns [`FeedError::Config`] if the client cannot be constructed.
pub fn build_client(source_id: &str, timeout_seconds: u64) -> Result<reqwest::Client, FeedError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| FeedError::config(source_id, format!("failed to build HTTP client: {e}")))
}

/// Read a response body as JSON, mapping non-2xx statuses to
/// [`FeedError::Upstream`] and unreadable bodies to [`FeedError::Parse`].
pub async fn read_json(
    source_id: &str,
    response: reqwest::Response,
) -> Result<serde_json::Value, FeedError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(FeedError::upstream(
            source_id,
            Some(status.as_u16()),
            format!("HTTP {}: {}", status.as_u16(), truncate(&body, 200)),
        ));
    }

    let text = response
        .text()
        .await
        .map_err(|e| FeedError::upstream(source_id, None, format!("response read failed: {e}")))?;
    tracing::trace!(source = source_id, bytes = text.len(), "feed response received");

    serde_json::from_str(&text)
        .map_err(|e| FeedError::parse(source_id, format!("response is not JSON: {e}")))
}

/// Map a transport-level `reqwest` failure to a feed error.
pub fn transport_error(source_id: &str, err: &reqwest::Error) -> FeedError {
    if err.is_timeout() {
        FeedError::upstream(source_id, None, format!("request timed out: {err}"))
    } else {
        FeedError::upstream(source_id, None, format!("request failed: {err}"))
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &trimmed[..idx]),
        None => trimmed.to_owned(),
    }
}
