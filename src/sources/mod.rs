pub mod resolver;
pub mod spotify;
pub mod ytdlp;

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;

pub use resolver::TrackResolver;
pub use spotify::SpotifySearch;
pub use ytdlp::YtDlpResolver;

/// Resultado de una búsqueda en el catálogo externo de metadata
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataMatch {
    pub catalog_id: String,
    pub title: String,
    pub artist: String,
    pub thumbnail: Option<String>,
}

/// Audio resuelto para una URL o búsqueda
#[derive(Debug, Clone, PartialEq)]
pub struct AudioInfo {
    /// URL estable del video (p. ej. `https://www.youtube.com/watch?v=..`)
    pub canonical_url: String,
    /// URL de stream con caducidad, sólo válida durante un rato
    pub stream_url: String,
    pub title: String,
    pub thumbnail: Option<String>,
}

/// Búsqueda de metadata por texto libre.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Option<MetadataMatch>>;
}

/// Resolución de un stream reproducible a partir de una URL o una búsqueda.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioResolver: Send + Sync {
    async fn resolve(&self, url_or_query: &str) -> Result<Option<AudioInfo>>;
}

/// Verifica si el texto es una URL de video de YouTube
pub fn is_youtube_url(query: &str) -> bool {
    static YOUTUBE_REGEX: OnceLock<Option<Regex>> = OnceLock::new();

    let regex = YOUTUBE_REGEX.get_or_init(|| {
        Regex::new(
            r"^(https?://)?(www\.|m\.)?(youtube\.com/(watch\?v=|embed/|v/|shorts/)|youtu\.be/|music\.youtube\.com/watch\?v=)",
        )
        .ok()
    });

    if regex.as_ref().map_or(false, |r| r.is_match(query.trim())) {
        return true;
    }

    // URLs con parámetros en otro orden (p. ej. `watch?feature=share&v=..`)
    match url::Url::parse(query.trim()) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or_default();
            matches!(
                host,
                "www.youtube.com" | "youtube.com" | "m.youtube.com" | "music.youtube.com"
            ) && parsed.query_pairs().any(|(k, _)| k == "v")
        }
        Err(_) => false,
    }
}
