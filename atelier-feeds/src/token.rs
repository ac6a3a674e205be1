//! Adapter-scoped bearer token cache.
//!
//! A feed that needs a short-lived token owns one [`TokenCache`]. Callers
//! read, check expiry, and only on a miss fetch a new token and store it.
//! The lock is never held across the fetch; two concurrent misses cost one
//! extra token round trip and nothing else.

use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Tokens are treated as expired this long before their stated expiry.
pub const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Upper bound on how long any token is trusted, whatever the upstream says.
pub const MAX_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Holds at most one bearer token with its expiry instant.
#[derive(Debug, Default)]
pub struct TokenCache {
    slot: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached token, if it is still valid now.
    pub fn current(&self) -> Option<String> {
        self.current_at(Instant::now())
    }

    /// The cached token, if it is still valid at `now`.
    pub fn current_at(&self, now: Instant) -> Option<String> {
        let guard = self.slot.read().ok()?;
        guard
            .as_ref()
            .filter(|token| now < token.expires_at)
            .map(|token| token.value.clone())
    }

    /// Store a token valid for `lifetime` from now.
    pub fn store(&self, value: String, lifetime: Duration) {
        self.store_at(value, lifetime, Instant::now());
    }

    /// Store a token valid for `lifetime` from `now`, minus [`EXPIRY_MARGIN`].
    ///
    /// `lifetime` is capped at [`MAX_LIFETIME`]. If the expiry cannot be
    /// represented the token is not cached and the next call fetches again.
    pub fn store_at(&self, value: String, lifetime: Duration, now: Instant) {
        let usable = lifetime.min(MAX_LIFETIME).saturating_sub(EXPIRY_MARGIN);
        let Some(expires_at) = now.checked_add(usable) else {
            tracing::warn!(lifetime_secs = lifetime.as_secs(), "token expiry out of range; not cached");
            return;
        };
        let token = CachedToken { value, expires_at };
        if let Ok(mut guard) = self.slot.write() {
            *guard = Some(token);
        }
    }

    /// Drop the cached token, e.g. after the upstream rejected it.
    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.slot.write() {
            *guard = None;
        }
    }
}
