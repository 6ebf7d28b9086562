use chrono::Utc;
use serenity::model::id::UserId;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{is_youtube_url, AudioResolver, MetadataMatch, MetadataSearch};
use crate::{
    audio::track::{Track, TrackOrigin},
    cache::SearchCache,
    catalog::{CatalogClient, CatalogRecord},
    error::ResolutionFailure,
};

/// Convierte la consulta de un usuario en un [`Track`] completo.
///
/// Combina la búsqueda de metadata, el catálogo persistente y la resolución
/// de audio. Nunca propaga errores crudos: todo termina en
/// [`ResolutionFailure`] para que quien llama sólo avise al usuario.
pub struct TrackResolver {
    catalog: Arc<dyn CatalogClient>,
    metadata: Arc<dyn MetadataSearch>,
    audio: Arc<dyn AudioResolver>,
    cache: SearchCache,
}

impl TrackResolver {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        metadata: Arc<dyn MetadataSearch>,
        audio: Arc<dyn AudioResolver>,
        cache: SearchCache,
    ) -> Self {
        Self {
            catalog,
            metadata,
            audio,
            cache,
        }
    }

    pub fn cache(&self) -> &SearchCache {
        &self.cache
    }

    pub async fn resolve(
        &self,
        query: &str,
        requester: &str,
        requester_id: UserId,
    ) -> Result<Track, ResolutionFailure> {
        let query = query.trim();

        let (meta, fresh_source) = if is_youtube_url(query) {
            info!("📺 Procesando URL de YouTube: {}", query);
            let video = self
                .audio
                .resolve(query)
                .await
                .map_err(|e| ResolutionFailure::Lookup(e.to_string()))?
                .ok_or_else(|| ResolutionFailure::NoAudio(query.to_string()))?;

            let meta = match self.search_metadata(&video.title).await? {
                Some(meta) => meta,
                None => self
                    .catalog_match(&video.title)
                    .await
                    .ok_or_else(|| ResolutionFailure::NoMetadata(video.title.clone()))?,
            };

            (meta, Some(video.canonical_url))
        } else {
            let meta = self
                .search_metadata(query)
                .await?
                .ok_or_else(|| ResolutionFailure::NoMetadata(query.to_string()))?;
            (meta, None)
        };

        let source_url = match self.stored_source(&meta.catalog_id).await {
            Some(stored) => {
                debug!("♻️ Reutilizando fuente guardada para {}", meta.title);
                stored
            }
            None => {
                let source = match fresh_source {
                    Some(source) => source,
                    None => {
                        let search = format!("{} {}", meta.artist, meta.title);
                        self.audio
                            .resolve(&search)
                            .await
                            .map_err(|e| ResolutionFailure::Lookup(e.to_string()))?
                            .ok_or_else(|| ResolutionFailure::NoAudio(search.clone()))?
                            .canonical_url
                    }
                };
                self.persist(&meta, &source, requester, requester_id).await;
                source
            }
        };

        Ok(Track {
            catalog_id: meta.catalog_id,
            title: meta.title,
            artist: meta.artist,
            thumbnail: meta.thumbnail,
            source_url,
            requester: requester.to_string(),
            requester_id,
            origin: TrackOrigin::Requested,
            status_message: None,
            request_channel: None,
            requested_at: Utc::now(),
        })
    }

    async fn search_metadata(&self, query: &str) -> Result<Option<MetadataMatch>, ResolutionFailure> {
        let key = SearchCache::key_for(query);
        if let Some(hit) = self.cache.get(&key) {
            debug!("🎯 Cache hit para búsqueda: {}", query);
            return Ok(Some(hit));
        }

        let found = self
            .metadata
            .search(query)
            .await
            .map_err(|e| ResolutionFailure::Lookup(e.to_string()))?;

        if let Some(meta) = &found {
            self.cache.insert(key, meta.clone());
        }
        Ok(found)
    }

    async fn catalog_match(&self, title: &str) -> Option<MetadataMatch> {
        match self.catalog.find_by_query(title).await {
            Ok(record) => record.map(|r| MetadataMatch {
                catalog_id: r.catalog_id,
                title: r.title,
                artist: r.artist,
                thumbnail: r.thumbnail,
            }),
            Err(e) => {
                warn!("Error consultando catálogo por título: {:?}", e);
                None
            }
        }
    }

    async fn stored_source(&self, catalog_id: &str) -> Option<String> {
        match self.catalog.find_by_key(catalog_id).await {
            Ok(Some(record)) if record.has_source() => Some(record.source_url),
            Ok(_) => None,
            Err(e) => {
                warn!("Error leyendo catálogo para {}: {:?}", catalog_id, e);
                None
            }
        }
    }

    async fn persist(&self, meta: &MetadataMatch, source: &str, requester: &str, requester_id: UserId) {
        let record = CatalogRecord {
            catalog_id: meta.catalog_id.clone(),
            title: meta.title.clone(),
            artist: meta.artist.clone(),
            thumbnail: meta.thumbnail.clone(),
            source_url: source.to_string(),
            requester: requester.to_string(),
            requester_id: requester_id.get(),
            last_played: None,
        };

        if let Err(e) = self.catalog.save(record).await {
            warn!("No se pudo guardar la fuente de {}: {:?}", meta.title, e);
        }
    }
}
