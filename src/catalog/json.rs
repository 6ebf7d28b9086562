use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info, warn};

use super::{CatalogClient, CatalogRecord};

/// Catálogo basado en archivos JSON, un archivo por canción
pub struct JsonCatalog {
    data_dir: PathBuf,
    records: RwLock<HashMap<String, CatalogRecord>>,
}

impl JsonCatalog {
    pub async fn new(data_dir: PathBuf) -> Result<Self> {
        let songs_dir = data_dir.join("songs");
        fs::create_dir_all(&songs_dir)
            .await
            .with_context(|| format!("cannot create {}", songs_dir.display()))?;

        info!("📁 Catálogo inicializado en: {}", data_dir.display());

        let catalog = Self {
            data_dir,
            records: RwLock::new(HashMap::new()),
        };

        catalog.load_all().await?;

        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    // Métodos privados

    async fn load_all(&self) -> Result<()> {
        let songs_dir = self.data_dir.join("songs");
        let mut files = fs::read_dir(&songs_dir).await?;
        let mut loaded = HashMap::new();

        while let Some(entry) = files.next_entry().await? {
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }

            let parsed = match fs::read_to_string(&path).await {
                Ok(content) => serde_json::from_str::<CatalogRecord>(&content)
                    .map_err(anyhow::Error::from),
                Err(e) => Err(e.into()),
            };

            match parsed {
                Ok(record) => {
                    loaded.insert(record.catalog_id.clone(), record);
                }
                Err(e) => warn!("Registro de catálogo ilegible {}: {}", path.display(), e),
            }
        }

        if !loaded.is_empty() {
            info!("📂 Cargadas {} canciones del catálogo", loaded.len());
        }

        *self.records.write() = loaded;
        Ok(())
    }

    async fn write_record(&self, record: &CatalogRecord) -> Result<()> {
        let path = self.record_path(&record.catalog_id);
        let content = serde_json::to_string_pretty(record)?;
        fs::write(&path, content)
            .await
            .with_context(|| format!("cannot write {}", path.display()))?;
        Ok(())
    }

    fn record_path(&self, catalog_id: &str) -> PathBuf {
        let file_name: String = catalog_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.data_dir.join("songs").join(format!("{}.json", file_name))
    }
}

#[async_trait]
impl CatalogClient for JsonCatalog {
    async fn find_by_key(&self, catalog_id: &str) -> Result<Option<CatalogRecord>> {
        Ok(self.records.read().get(catalog_id).cloned())
    }

    async fn find_by_query(&self, query: &str) -> Result<Option<CatalogRecord>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(None);
        }

        let records = self.records.read();
        let found = records.values().find(|record| {
            let title = record.title.to_lowercase();
            let artist = record.artist.to_lowercase();
            needle == title
                || needle == format!("{} {}", artist, title)
                || needle == format!("{} {}", title, artist)
        });

        Ok(found.cloned())
    }

    async fn save(&self, record: CatalogRecord) -> Result<()> {
        // Upsert: un registro existente sólo actualiza fuente y miniatura
        let merged = {
            let mut records = self.records.write();
            let merged = match records.get(&record.catalog_id) {
                Some(existing) => CatalogRecord {
                    source_url: record.source_url,
                    thumbnail: record.thumbnail,
                    last_played: record.last_played.or(existing.last_played),
                    ..existing.clone()
                },
                None => record,
            };
            records.insert(merged.catalog_id.clone(), merged.clone());
            merged
        };

        self.write_record(&merged).await?;
        debug!("💾 Canción guardada en catálogo: {}", merged.title);
        Ok(())
    }

    async fn random_or_next(&self, exclude_last: Option<&str>) -> Result<Option<CatalogRecord>> {
        let records = self.records.read();
        let candidates: Vec<&CatalogRecord> = records
            .values()
            .filter(|record| records.len() <= 1 || Some(record.catalog_id.as_str()) != exclude_last)
            .collect();

        let mut rng = rand::thread_rng();
        Ok(candidates.choose(&mut rng).map(|record| (*record).clone()))
    }

    async fn all_tracks(&self) -> Result<Vec<CatalogRecord>> {
        let mut all: Vec<CatalogRecord> = self.records.read().values().cloned().collect();
        all.sort_by(|a, b| a.catalog_id.cmp(&b.catalog_id));
        Ok(all)
    }
}
