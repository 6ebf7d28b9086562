use thiserror::Error;

/// Fallo al convertir una petición de usuario en un [`Track`](crate::audio::track::Track).
///
/// Es recuperable: el usuario recibe un aviso y el estado del guild no cambia.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionFailure {
    #[error("no metadata match for `{0}`")]
    NoMetadata(String),

    #[error("no audio match for `{0}`")]
    NoAudio(String),

    #[error("lookup failed: {0}")]
    Lookup(String),
}

/// Errores devueltos por un [`VoiceHandle`](crate::audio::transport::VoiceHandle).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("voice connection is not available")]
    Disconnected,

    #[error("failed to start stream: {0}")]
    Stream(String),

    #[error("track control failed: {0}")]
    Control(String),
}

/// Motivos por los que un ciclo de reproducción no pudo arrancar un track.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// La fuente guardada caducó y la re-búsqueda tampoco encontró audio.
    #[error("stale source for `{title}` could not be refreshed")]
    StaleSource { title: String },

    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("guild has no voice connection")]
    NotConnected,

    #[error("catalog has no tracks to fall back on")]
    EmptyCatalog,
}
