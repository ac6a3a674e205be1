//! Shopper preference persistence.
//!
//! Preferences are stored as an opaque JSON blob per user. The service
//! reads only the fields that shape a search through
//! [`Preferences::from_blob`], and tolerates anything else in the blob.
//! Writes go through [`SharedPreferences`], which serializes them so a
//! read-modify-write such as [`SharedPreferences::toggle_favorite`] cannot
//! lose a concurrent update.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use async_trait::async_trait;
use atelier_feeds::{Gender, PriceRange, QueryContext, SortMode};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::config::{PrefsBackend, PrefsConfig};
use crate::error::{AppError, Result};

/// Lower price bound applied when a stored blob has none.
pub const DEFAULT_MIN_PRICE: f64 = 0.0;
/// Upper price bound applied when a stored blob has none.
pub const DEFAULT_MAX_PRICE: f64 = 5000.0;

/// Key-value persistence for preference blobs.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Load the blob for `user`, or `None` if nothing is stored.
    async fn load(&self, user: &str) -> Result<Option<Value>>;

    /// Replace the blob for `user`.
    async fn save(&self, user: &str, blob: &Value) -> Result<()>;
}

/// Build the store selected by `config`.
pub fn open_store(config: &PrefsConfig) -> Box<dyn PreferenceStore> {
    match config.backend {
        PrefsBackend::Memory => Box::new(MemoryPreferenceStore::new()),
        PrefsBackend::File => Box::new(FilePreferenceStore::new(config.resolved_dir())),
    }
}

/// Accept only ids made of ASCII letters, digits, `_` and `-`.
///
/// # Errors
///
/// Returns [`AppError::InvalidUser`] for an empty or out-of-alphabet id.
pub fn validate_user_id(user: &str) -> Result<()> {
    let valid = !user.is_empty()
        && user.len() <= 128
        && user
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if valid {
        Ok(())
    } else {
        Err(AppError::InvalidUser(user.to_owned()))
    }
}

/// Process-local store; contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    blobs: RwLock<HashMap<String, Value>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn load(&self, user: &str) -> Result<Option<Value>> {
        validate_user_id(user)?;
        let blobs = self
            .blobs
            .read()
            .map_err(|_| AppError::Prefs("memory store lock poisoned".into()))?;
        Ok(blobs.get(user).cloned())
    }

    async fn save(&self, user: &str, blob: &Value) -> Result<()> {
        validate_user_id(user)?;
        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| AppError::Prefs("memory store lock poisoned".into()))?;
        blobs.insert(user.to_owned(), blob.clone());
        Ok(())
    }
}

/// One `<user>.json` file per user under a directory.
#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
    dir: PathBuf,
}

impl FilePreferenceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, user: &str) -> Result<PathBuf> {
        validate_user_id(user)?;
        Ok(self.dir.join(format!("{user}.json")))
    }
}

#[async_trait]
impl PreferenceStore for FilePreferenceStore {
    async fn load(&self, user: &str) -> Result<Option<Value>> {
        let path = self.path_for(user)?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    async fn save(&self, user: &str, blob: &Value) -> Result<()> {
        let path = self.path_for(user)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(blob)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        tracing::debug!(user, "preferences saved");
        Ok(())
    }
}

/// The search-shaping view of a preference blob.
#[derive(Debug, Clone, PartialEq)]
pub struct Preferences {
    pub palette: Option<String>,
    pub body: Option<String>,
    pub materials: Vec<String>,
    pub gender: Option<Gender>,
    pub min_price: f64,
    pub max_price: f64,
    pub sort: SortMode,
    pub favorites: Vec<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            palette: None,
            body: None,
            materials: Vec::new(),
            gender: None,
            min_price: DEFAULT_MIN_PRICE,
            max_price: DEFAULT_MAX_PRICE,
            sort: SortMode::Relevance,
            favorites: Vec::new(),
        }
    }
}

impl Preferences {
    /// Read preferences from a stored blob.
    ///
    /// Unknown keys, wrong types and unparseable values fall back to the
    /// defaults field by field; a blob that is not an object yields
    /// [`Preferences::default`].
    pub fn from_blob(blob: &Value) -> Self {
        let defaults = Self::default();
        let text = |key: &str| {
            blob.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };
        let number = |key: &str| {
            let n = match blob.get(key)? {
                Value::Number(n) => n.as_f64()?,
                Value::String(s) => s.trim().parse::<f64>().ok()?,
                _ => return None,
            };
            n.is_finite().then_some(n)
        };
        let list = |key: &str| -> Vec<String> {
            blob.get(key)
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .filter(|s| !s.trim().is_empty())
                        .map(str::to_owned)
                        .collect()
                })
                .unwrap_or_default()
        };

        Self {
            palette: text("palette"),
            body: text("body"),
            materials: list("materials"),
            gender: text("gender").and_then(|g| Gender::parse_loose(&g)),
            min_price: number("minPrice").unwrap_or(defaults.min_price),
            max_price: number("maxPrice").unwrap_or(defaults.max_price),
            sort: text("sort")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.sort),
            favorites: list("favorites"),
        }
    }

    /// A query context for `query` carrying these preferences.
    pub fn query_context(&self, query: impl Into<String>) -> QueryContext {
        QueryContext {
            query: query.into(),
            price: PriceRange::new(self.min_price, self.max_price),
            gender: self.gender,
            palette: self.palette.clone(),
            body: self.body.clone(),
            materials: self.materials.clone(),
            sort: self.sort,
        }
    }
}

/// A preference store with serialized writes.
pub struct SharedPreferences {
    store: Box<dyn PreferenceStore>,
    writes: Mutex<()>,
}

impl std::fmt::Debug for SharedPreferences {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedPreferences").finish_non_exhaustive()
    }
}

impl SharedPreferences {
    pub fn new(store: Box<dyn PreferenceStore>) -> Self {
        Self {
            store,
            writes: Mutex::new(()),
        }
    }

    pub async fn load(&self, user: &str) -> Result<Option<Value>> {
        self.store.load(user).await
    }

    pub async fn save(&self, user: &str, blob: &Value) -> Result<()> {
        let _guard = self.writes.lock().await;
        self.store.save(user, blob).await
    }

    /// Add `product_id` to the user's favorites, or remove it if present.
    ///
    /// Other keys in the stored blob are preserved. Returns the new list.
    ///
    /// # Errors
    ///
    /// Returns an error if the user id is invalid or the store fails.
    pub async fn toggle_favorite(&self, user: &str, product_id: &str) -> Result<Vec<String>> {
        let _guard = self.writes.lock().await;
        let mut blob = match self.store.load(user).await? {
            Some(blob @ Value::Object(_)) => blob,
            _ => json!({}),
        };
        let mut favorites = Preferences::from_blob(&blob).favorites;
        match favorites.iter().position(|id| id == product_id) {
            Some(index) => {
                favorites.remove(index);
            }
            None => favorites.push(product_id.to_owned()),
        }
        if let Some(map) = blob.as_object_mut() {
            map.insert("favorites".into(), json!(favorites));
        }
        self.store.save(user, &blob).await?;
        Ok(favorites)
    }
}
