use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    input::HttpRequest,
    tracks::{PlayMode, TrackHandle},
    Call, Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::signal::{AdvanceReason, EndNotifier};
use crate::error::TransportError;

/// Conexión de voz de un guild, propiedad exclusiva de su estado de reproducción.
#[async_trait]
pub trait VoiceHandle: Send + Sync {
    /// Empieza a emitir `stream_url`; `on_end` se avisa cuando el stream termina.
    async fn play(&self, stream_url: &str, on_end: EndNotifier) -> Result<(), TransportError>;

    async fn pause(&self) -> Result<(), TransportError>;

    async fn resume(&self) -> Result<(), TransportError>;

    async fn stop(&self) -> Result<(), TransportError>;

    /// Reproduciendo o en pausa.
    async fn is_playing(&self) -> bool;
}

/// [`VoiceHandle`] sobre una llamada de songbird.
pub struct SongbirdHandle {
    call: Arc<tokio::sync::Mutex<Call>>,
    http_client: reqwest::Client,
    track: Mutex<Option<TrackHandle>>,
}

impl SongbirdHandle {
    /// Une el bot al canal de voz
    pub async fn connect(
        manager: &Songbird,
        guild_id: GuildId,
        channel_id: ChannelId,
        http_client: reqwest::Client,
    ) -> Result<Self, TransportError> {
        let call = manager.join(guild_id, channel_id).await.map_err(|e| {
            warn!("❌ Error al unirse al canal de voz {}: {}", channel_id, e);
            TransportError::Disconnected
        })?;

        {
            let mut handler = call.lock().await;
            if let Err(e) = handler.deafen(true).await {
                warn!("No se pudo ensordecer el bot: {}", e);
            }
        }

        info!("🔊 Conectado a canal de voz {} en guild {}", channel_id, guild_id);

        Ok(Self {
            call,
            http_client,
            track: Mutex::new(None),
        })
    }

    fn current_track(&self) -> Result<TrackHandle, TransportError> {
        self.track.lock().clone().ok_or(TransportError::Disconnected)
    }
}

#[async_trait]
impl VoiceHandle for SongbirdHandle {
    async fn play(&self, stream_url: &str, on_end: EndNotifier) -> Result<(), TransportError> {
        let input = HttpRequest::new(self.http_client.clone(), stream_url.to_string());

        let handle = {
            let mut call = self.call.lock().await;
            if call.current_connection().is_none() {
                return Err(TransportError::Disconnected);
            }
            call.stop();
            call.play_input(input.into())
        };

        register_end_events(
            &[TrackEvent::End, TrackEvent::Error],
            |event| {
                handle.add_event(
                    Event::Track(event),
                    TrackEndHandler {
                        notifier: on_end.clone(),
                    },
                )
            },
            || {
                if let Err(e) = handle.stop() {
                    debug!("stop tras fallo de eventos: {}", e);
                }
            },
        )?;

        debug!("▶️ Stream iniciado (gen {})", on_end.generation());
        *self.track.lock() = Some(handle);
        Ok(())
    }

    async fn pause(&self) -> Result<(), TransportError> {
        self.current_track()?
            .pause()
            .map_err(|e| TransportError::Control(e.to_string()))
    }

    async fn resume(&self) -> Result<(), TransportError> {
        self.current_track()?
            .play()
            .map_err(|e| TransportError::Control(e.to_string()))
    }

    async fn stop(&self) -> Result<(), TransportError> {
        let Some(track) = self.track.lock().take() else {
            return Ok(());
        };
        track
            .stop()
            .map_err(|e| TransportError::Control(e.to_string()))
    }

    async fn is_playing(&self) -> bool {
        let track = self.track.lock().clone();
        match track {
            Some(track) => match track.get_info().await {
                Ok(info) => matches!(info.playing, PlayMode::Play | PlayMode::Pause),
                Err(_) => false,
            },
            None => false,
        }
    }
}

/// Registra los eventos de fin de un track que ya está sonando.
///
/// Si alguno falla se para el track con `stop`: sin eventos nadie avisaría
/// de su fin y seguiría sonando sin track activo.
fn register_end_events<E, R, S>(
    events: &[TrackEvent],
    mut register: R,
    stop: S,
) -> Result<(), TransportError>
where
    E: std::fmt::Display,
    R: FnMut(TrackEvent) -> Result<(), E>,
    S: FnOnce(),
{
    for event in events {
        if let Err(e) = register(*event) {
            warn!("❌ No se pudo registrar {:?}: {}", event, e);
            stop();
            return Err(TransportError::Stream(e.to_string()));
        }
    }
    Ok(())
}

/// Avisa a la señal de avance cuando songbird termina (o falla) un track
struct TrackEndHandler {
    notifier: EndNotifier,
}

#[async_trait]
impl VoiceEventHandler for TrackEndHandler {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        if self.notifier.notify(AdvanceReason::Finished) {
            debug!("🏁 Track terminado (gen {})", self.notifier.generation());
        }
        None
    }
}
