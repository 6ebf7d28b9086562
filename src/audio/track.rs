use chrono::{DateTime, Utc};
use serenity::model::id::{ChannelId, UserId};

use crate::{catalog::CatalogRecord, ui::MessageRef};

/// De dónde salió un track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackOrigin {
    /// Pedido por un usuario y puesto en cola.
    #[default]
    Requested,
    /// Elegido por el motor desde el catálogo porque la cola estaba vacía.
    Fallback,
}

/// Canción resuelta lista para reproducir.
///
/// Sólo cambian `status_message` (al renderizar su estado), `source_url`
/// (cuando la fuente guardada caduca y se vuelve a buscar) y
/// `request_channel` (al encolarlo).
#[derive(Debug, Clone)]
pub struct Track {
    pub catalog_id: String,
    pub title: String,
    pub artist: String,
    pub thumbnail: Option<String>,
    /// Localizador canónico del audio (p. ej. URL de YouTube). Puede quedar obsoleto.
    pub source_url: String,
    pub requester: String,
    pub requester_id: UserId,
    pub origin: TrackOrigin,
    pub status_message: Option<MessageRef>,
    /// Canal de texto donde se pidió; `None` para los tracks de relleno.
    pub request_channel: Option<ChannelId>,
    pub requested_at: DateTime<Utc>,
}

impl Track {
    pub fn is_fallback(&self) -> bool {
        self.origin == TrackOrigin::Fallback
    }

    /// Consulta usada para volver a encontrar el audio cuando la fuente caduca.
    pub fn search_query(&self) -> String {
        format!("{} {}", self.title, self.artist)
    }

    /// Track elegido desde el catálogo para la playlist de relleno.
    ///
    /// El solicitante es el último que lo pidió, así los botones siguen
    /// dando prioridad a esa persona.
    pub fn from_catalog(record: CatalogRecord) -> Self {
        Self {
            catalog_id: record.catalog_id,
            title: record.title,
            artist: record.artist,
            thumbnail: record.thumbnail,
            source_url: record.source_url,
            requester: record.requester,
            requester_id: UserId::new(record.requester_id.max(1)),
            origin: TrackOrigin::Fallback,
            status_message: None,
            request_channel: None,
            requested_at: Utc::now(),
        }
    }

    pub fn to_record(&self) -> CatalogRecord {
        CatalogRecord {
            catalog_id: self.catalog_id.clone(),
            title: self.title.clone(),
            artist: self.artist.clone(),
            thumbnail: self.thumbnail.clone(),
            source_url: self.source_url.clone(),
            requester: self.requester.clone(),
            requester_id: self.requester_id.get(),
            last_played: Some(Utc::now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_tracks_are_tagged_as_fallback() {
        let record = CatalogRecord {
            catalog_id: "abc".to_string(),
            title: "Song".to_string(),
            artist: "Artist".to_string(),
            thumbnail: None,
            source_url: "https://www.youtube.com/watch?v=abc".to_string(),
            requester: "ana".to_string(),
            requester_id: 0,
            last_played: None,
        };

        let track = Track::from_catalog(record);
        assert!(track.is_fallback());
        assert!(track.status_message.is_none());
        assert!(track.request_channel.is_none());
        assert_eq!(track.requester_id, UserId::new(1));
        assert_eq!(track.search_query(), "Song Artist");
    }
}
