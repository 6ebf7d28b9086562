//! # Catalog Module
//!
//! Persistent song catalog: every track that finished playing is archived
//! here, keyed by its catalog id. The catalog serves two purposes:
//!
//! - **Source reuse**: a stored source URL for a catalog id saves a call to
//!   the external audio resolver the next time the same song is requested.
//! - **Endless playlist**: when a guild's request queue runs dry the engine
//!   draws fallback tracks from the full catalog.
//!
//! Live guild queues are never stored here.

pub mod json;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use json::JsonCatalog;

/// One archived song.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub catalog_id: String,
    pub title: String,
    pub artist: String,
    pub thumbnail: Option<String>,
    pub source_url: String,
    pub requester: String,
    #[serde(default)]
    pub requester_id: u64,
    #[serde(default)]
    pub last_played: Option<DateTime<Utc>>,
}

impl CatalogRecord {
    /// Whether the record carries a reusable audio locator.
    pub fn has_source(&self) -> bool {
        !self.source_url.trim().is_empty()
    }
}

/// Access to the persistent song catalog.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn find_by_key(&self, catalog_id: &str) -> Result<Option<CatalogRecord>>;

    /// Case-insensitive lookup by title, or by "artist title" / "title artist".
    async fn find_by_query(&self, query: &str) -> Result<Option<CatalogRecord>>;

    /// Inserts the record, or refreshes source URL and thumbnail of an existing one.
    async fn save(&self, record: CatalogRecord) -> Result<()>;

    /// Random record, avoiding `exclude_last` whenever another record exists.
    async fn random_or_next(&self, exclude_last: Option<&str>) -> Result<Option<CatalogRecord>>;

    async fn all_tracks(&self) -> Result<Vec<CatalogRecord>>;
}
