//! Atelier: fashion product search over aggregated commerce feeds.
//!
//! This crate is the service around [`atelier_feeds`]:
//! HTTP request → preferences → aggregate → rank → JSON
//!
//! # Architecture
//!
//! - **Config**: TOML file plus feed credentials from the environment
//! - **Preferences**: opaque per-user JSON blobs behind [`prefs::PreferenceStore`],
//!   with writes serialized by [`prefs::SharedPreferences`]
//! - **Server**: axum routes for single-feed search, ranked aggregate
//!   search, and preference storage

pub mod config;
pub mod error;
pub mod prefs;
pub mod server;

pub use config::AppConfig;
pub use error::{AppError, Result};
