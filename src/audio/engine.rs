use serenity::model::id::ChannelId;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{
    signal::{AdvanceReason, AdvanceWaiter, EndNotifier},
    state::GuildPlaybackState,
    track::Track,
};
use crate::{
    catalog::CatalogClient,
    error::PlaybackError,
    sources::AudioResolver,
    ui::{Messenger, TrackStatus},
};

/// Aviso en el canal cuando un track no pudo arrancar.
pub const PLAYBACK_ERROR_MESSAGE: &str = "An error occurred while playing the song.";

/// Qué hizo `enqueue_or_play` con el track.
#[derive(Debug)]
pub enum Enqueued {
    /// El guild estaba ocupado; el track quedó en la posición indicada (1 = siguiente).
    Queued { position: usize },
    /// El guild estaba libre; arrancó un ciclo de reproducción.
    Started(JoinHandle<()>),
}

impl Enqueued {
    pub fn is_started(&self) -> bool {
        matches!(self, Enqueued::Started(_))
    }
}

/// Máquina de estados de reproducción de un guild.
///
/// Cada guild tiene como mucho un ciclo vivo:
/// `play → esperar señal → on_advance → siguiente track → play ...`,
/// expresado como un bucle explícito en [`PlaybackEngine::run_cycle`].
#[derive(Clone)]
pub struct PlaybackEngine {
    catalog: Arc<dyn CatalogClient>,
    audio: Arc<dyn AudioResolver>,
    messenger: Arc<dyn Messenger>,
    max_consecutive_failures: u32,
}

impl PlaybackEngine {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        audio: Arc<dyn AudioResolver>,
        messenger: Arc<dyn Messenger>,
        max_consecutive_failures: u32,
    ) -> Self {
        Self {
            catalog,
            audio,
            messenger,
            max_consecutive_failures: max_consecutive_failures.max(1),
        }
    }

    /// Encola `track` si el guild está ocupado, o arranca un ciclo nuevo.
    ///
    /// La decisión se toma con el lock de la cola; el ciclo arranca fuera de él.
    pub async fn enqueue_or_play(
        &self,
        state: &Arc<GuildPlaybackState>,
        channel: ChannelId,
        mut track: Track,
    ) -> Enqueued {
        track.request_channel = Some(channel);
        let mut queue = state.lock_queue().await;
        state.set_text_channel(channel);

        if state.is_busy() || state.transport_is_playing().await {
            match self
                .messenger
                .send_status(channel, &track, TrackStatus::Queued)
                .await
            {
                Ok(message) => track.status_message = Some(message),
                Err(e) => warn!("No se pudo enviar el mensaje de cola: {}", e),
            }

            info!("📋 En cola: {} (guild {})", track.title, state.guild_id());
            queue.push_back(track);
            return Enqueued::Queued {
                position: queue.len(),
            };
        }

        state.set_cycle_active(true);
        drop(queue);

        let engine = self.clone();
        let state = state.clone();
        Enqueued::Started(tokio::spawn(async move {
            engine.run_cycle(state, track).await;
        }))
    }

    /// Bucle de reproducción de un guild hasta quedar inactivo.
    pub async fn run_cycle(&self, state: Arc<GuildPlaybackState>, first: Track) {
        let guild_id = state.guild_id();
        let mut next = Some(first);
        let mut failures = 0u32;

        while let Some(track) = next.take() {
            let reason = match self.play(&state, track).await {
                Ok(waiter) => {
                    failures = 0;
                    let reason = waiter.wait().await;
                    debug!("Fin de ciclo en guild {}: {:?}", guild_id, reason);
                    self.on_advance(&state, reason).await;
                    reason
                }
                Err(e) => {
                    failures += 1;
                    warn!(
                        "⚠️ Fallo de reproducción {}/{} en guild {}: {}",
                        failures, self.max_consecutive_failures, guild_id, e
                    );
                    AdvanceReason::Finished
                }
            };

            let allow_fallback = reason != AdvanceReason::Cancelled
                && failures < self.max_consecutive_failures;
            next = self.next_track(&state, allow_fallback).await;
        }

        info!("💤 Guild {} inactivo", guild_id);
    }

    /// Arranca `track` y devuelve el lado que espera su fin.
    ///
    /// Si no arranca, avisa al canal y deja el guild sin track activo.
    pub async fn play(
        &self,
        state: &GuildPlaybackState,
        track: Track,
    ) -> Result<AdvanceWaiter, PlaybackError> {
        // Los tracks de relleno no tienen canal propio: van al último activo
        let channel = track.request_channel.or_else(|| state.text_channel());
        state.begin_track(track.clone());
        let (notifier, waiter) = state.signal().arm();

        info!("🎵 Reproduciendo: {} - {}", track.title, track.artist);

        if let Err(e) = self.start_stream(state, &track, notifier).await {
            error!("❌ No se pudo reproducir {}: {}", track.title, e);
            state.take_current();
            state.signal().cancel();
            // El mensaje de cola no puede quedarse en "Queued"
            if let Some(message) = track.status_message {
                if let Err(e) = self
                    .messenger
                    .edit_status(message, &track, TrackStatus::Skipped)
                    .await
                {
                    warn!("No se pudo cerrar el mensaje de cola: {}", e);
                }
            }
            if let Some(channel) = channel {
                if let Err(e) = self.messenger.send_text(channel, PLAYBACK_ERROR_MESSAGE).await {
                    warn!("No se pudo avisar del error: {}", e);
                }
            }
            return Err(e);
        }

        self.render_now_playing(state, channel, &track).await;
        Ok(waiter)
    }

    async fn start_stream(
        &self,
        state: &GuildPlaybackState,
        track: &Track,
        notifier: EndNotifier,
    ) -> Result<(), PlaybackError> {
        let transport = state.transport().ok_or(PlaybackError::NotConnected)?;
        let stream_url = self.fresh_stream_url(state, track).await?;
        transport.play(&stream_url, notifier).await?;
        Ok(())
    }

    /// Stream reproducible para `track`; si la fuente guardada caducó se
    /// busca de nuevo por título y artista y se guarda la corregida.
    async fn fresh_stream_url(
        &self,
        state: &GuildPlaybackState,
        track: &Track,
    ) -> Result<String, PlaybackError> {
        if !track.source_url.trim().is_empty() {
            match self.audio.resolve(&track.source_url).await {
                Ok(Some(info)) => return Ok(info.stream_url),
                Ok(None) => warn!("Fuente caducada para {}: {}", track.title, track.source_url),
                Err(e) => warn!("Error con la fuente de {}, buscando otra: {}", track.title, e),
            }
        }

        let query = track.search_query();
        let info = match self.audio.resolve(&query).await {
            Ok(Some(info)) => info,
            Ok(None) => {
                return Err(PlaybackError::StaleSource {
                    title: track.title.clone(),
                })
            }
            Err(e) => {
                error!("Error al buscar una fuente nueva para {}: {}", track.title, e);
                return Err(PlaybackError::StaleSource {
                    title: track.title.clone(),
                });
            }
        };

        info!("🔁 Nueva fuente para {}: {}", track.title, info.canonical_url);
        state.update_current_source(&info.canonical_url);

        let mut record = track.to_record();
        record.source_url = info.canonical_url;
        if let Err(e) = self.catalog.save(record).await {
            warn!("No se pudo guardar la fuente corregida: {}", e);
        }

        Ok(info.stream_url)
    }

    /// Cierra la vida del track activo: estado final, archivo y limpieza.
    pub async fn on_advance(&self, state: &GuildPlaybackState, reason: AdvanceReason) {
        if reason != AdvanceReason::Finished {
            // Un skip ya paró el stream; repetirlo no hace daño
            if let Some(transport) = state.transport() {
                if let Err(e) = transport.stop().await {
                    debug!("stop tras {:?}: {}", reason, e);
                }
            }
        }

        let Some(track) = state.take_current() else {
            debug!("Sin track activo al avanzar ({:?})", reason);
            return;
        };

        if reason == AdvanceReason::Cancelled {
            debug!("Ciclo cancelado con {} activo", track.title);
            return;
        }

        let status = if reason == AdvanceReason::Skipped {
            TrackStatus::Skipped
        } else {
            TrackStatus::Played
        };

        if let Some(message) = track.status_message {
            if let Err(e) = self.messenger.edit_status(message, &track, status).await {
                warn!("No se pudo actualizar el mensaje final: {}", e);
            }
        }

        if let Err(e) = self.catalog.save(track.to_record()).await {
            warn!("No se pudo archivar {}: {}", track.title, e);
        }
        state.playlist().note_finished(&track.catalog_id);

        info!("✅ {:?}: {}", status, track.title);
    }

    /// Siguiente track: cabeza de la cola, si no relleno del catálogo.
    ///
    /// Si no hay nada, el ciclo se da por terminado bajo el lock de la cola
    /// para que una petición concurrente no quede huérfana.
    pub async fn next_track(
        &self,
        state: &GuildPlaybackState,
        allow_fallback: bool,
    ) -> Option<Track> {
        if let Some(track) = state.lock_queue().await.pop_front() {
            debug!("Siguiente de la cola: {}", track.title);
            return Some(track);
        }

        // Sin conexión de voz no tiene sentido seguir con la playlist
        if allow_fallback && state.transport().is_some() {
            match state.playlist().next(self.catalog.as_ref()).await {
                Ok(Some(record)) => {
                    info!("🎲 Cola vacía, sigue la playlist: {}", record.title);
                    return Some(Track::from_catalog(record));
                }
                Ok(None) => debug!("{}", PlaybackError::EmptyCatalog),
                Err(e) => warn!("Error al elegir track de relleno: {}", e),
            }
        }

        let mut queue = state.lock_queue().await;
        if let Some(track) = queue.pop_front() {
            return Some(track);
        }
        state.set_cycle_active(false);
        None
    }

    async fn render_now_playing(
        &self,
        state: &GuildPlaybackState,
        channel: Option<ChannelId>,
        track: &Track,
    ) {
        if let Some(message) = track.status_message {
            match self
                .messenger
                .edit_status(message, track, TrackStatus::NowPlaying)
                .await
            {
                Ok(()) => {
                    state.set_status_message(Some(message));
                    return;
                }
                // El mensaje de cola pudo borrarse; se envía uno nuevo
                Err(e) => warn!("No se pudo editar el mensaje de cola: {}", e),
            }
        }

        let Some(channel) = channel else {
            return;
        };

        match self
            .messenger
            .send_status(channel, track, TrackStatus::NowPlaying)
            .await
        {
            Ok(message) => state.set_status_message(Some(message)),
            Err(e) => warn!("No se pudo enviar el mensaje de reproducción: {}", e),
        }
    }
}
