use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serenity::model::id::{ChannelId, GuildId, UserId};
use std::{
    collections::{HashSet, VecDeque},
    future::Future,
    sync::Arc,
};
use tokio::sync::MutexGuard;
use tracing::{debug, info};

use super::{
    playlist::FallbackPlaylist,
    signal::AdvanceSignal,
    track::Track,
    transport::VoiceHandle,
};
use crate::{config::FallbackMode, ui::MessageRef};

/// Estado de la sesión que no es la cola.
#[derive(Debug, Default)]
struct Session {
    current: Option<Track>,
    paused: bool,
    status_message: Option<MessageRef>,
    skip_votes: HashSet<UserId>,
    pause_votes: HashSet<UserId>,
    /// Hay un ciclo del motor en marcha (o a punto de arrancar).
    cycle_active: bool,
    text_channel: Option<ChannelId>,
}

impl Session {
    fn reset_votes(&mut self) {
        self.skip_votes.clear();
        self.pause_votes.clear();
    }

    /// Registra un voto y dice si la acción ya puede ejecutarse.
    fn vote(&mut self, user_id: UserId, required: usize, skip: bool) -> bool {
        let Some(requester) = self.current.as_ref().map(|t| t.requester_id) else {
            return false;
        };

        if user_id == requester {
            return true;
        }

        let votes = if skip {
            &mut self.skip_votes
        } else {
            &mut self.pause_votes
        };
        votes.insert(user_id);
        votes.len() >= required
    }
}

/// Estado de reproducción de un guild.
///
/// La cola vive detrás de un `tokio::sync::Mutex` que hace de lock de
/// mutación: toda secuencia leer-modificar-escribir sobre la cola (y la
/// decisión de reproducir ya o encolar) ocurre con ese guard tomado.
pub struct GuildPlaybackState {
    guild_id: GuildId,
    queue: tokio::sync::Mutex<VecDeque<Track>>,
    session: Mutex<Session>,
    transport: RwLock<Option<Arc<dyn VoiceHandle>>>,
    /// Serializa las conexiones de voz del guild.
    join_lock: tokio::sync::Mutex<()>,
    signal: Arc<AdvanceSignal>,
    playlist: FallbackPlaylist,
}

impl GuildPlaybackState {
    pub fn new(guild_id: GuildId, fallback_mode: FallbackMode) -> Self {
        Self {
            guild_id,
            queue: tokio::sync::Mutex::new(VecDeque::new()),
            session: Mutex::new(Session::default()),
            transport: RwLock::new(None),
            join_lock: tokio::sync::Mutex::new(()),
            signal: AdvanceSignal::new(),
            playlist: FallbackPlaylist::new(fallback_mode),
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    /// Toma el lock de mutación de la cola.
    pub async fn lock_queue(&self) -> MutexGuard<'_, VecDeque<Track>> {
        self.queue.lock().await
    }

    pub async fn queue_len(&self) -> usize {
        self.queue.lock().await.len()
    }

    pub async fn queued_titles(&self) -> Vec<String> {
        self.queue
            .lock()
            .await
            .iter()
            .map(|t| t.title.clone())
            .collect()
    }

    // Sesión

    pub fn current(&self) -> Option<Track> {
        self.session.lock().current.clone()
    }

    pub fn has_current(&self) -> bool {
        self.session.lock().current.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.session.lock().paused
    }

    pub fn set_paused(&self, paused: bool) {
        self.session.lock().paused = paused;
    }

    pub fn status_message(&self) -> Option<MessageRef> {
        self.session.lock().status_message
    }

    pub fn set_status_message(&self, message: Option<MessageRef>) {
        let mut session = self.session.lock();
        session.status_message = message;
        if let Some(current) = session.current.as_mut() {
            current.status_message = message;
        }
    }

    /// Marca `track` como el track activo y empieza un ciclo limpio.
    pub fn begin_track(&self, track: Track) {
        let mut session = self.session.lock();
        session.status_message = track.status_message;
        session.current = Some(track);
        session.paused = false;
        session.reset_votes();
    }

    /// Retira el track activo.
    pub fn take_current(&self) -> Option<Track> {
        let mut session = self.session.lock();
        session.paused = false;
        session.status_message = None;
        session.reset_votes();
        session.current.take()
    }

    /// Actualiza la fuente del track activo tras una re-búsqueda.
    pub fn update_current_source(&self, source_url: &str) {
        if let Some(current) = self.session.lock().current.as_mut() {
            current.source_url = source_url.to_string();
        }
    }

    pub fn text_channel(&self) -> Option<ChannelId> {
        self.session.lock().text_channel
    }

    pub fn set_text_channel(&self, channel: ChannelId) {
        self.session.lock().text_channel = Some(channel);
    }

    // Ciclo del motor

    pub fn is_cycle_active(&self) -> bool {
        self.session.lock().cycle_active
    }

    pub fn set_cycle_active(&self, active: bool) {
        self.session.lock().cycle_active = active;
    }

    /// Hay algo sonando, en pausa o por arrancar.
    pub fn is_busy(&self) -> bool {
        let session = self.session.lock();
        session.current.is_some() || session.paused || session.cycle_active
    }

    // Votos

    pub fn add_skip_vote(&self, user_id: UserId, required_votes: usize) -> bool {
        self.session.lock().vote(user_id, required_votes, true)
    }

    pub fn add_pause_vote(&self, user_id: UserId, required_votes: usize) -> bool {
        self.session.lock().vote(user_id, required_votes, false)
    }

    pub fn skip_vote_count(&self) -> usize {
        self.session.lock().skip_votes.len()
    }

    pub fn pause_vote_count(&self) -> usize {
        self.session.lock().pause_votes.len()
    }

    pub fn reset_votes(&self) {
        self.session.lock().reset_votes();
    }

    // Transporte

    pub fn transport(&self) -> Option<Arc<dyn VoiceHandle>> {
        self.transport.read().clone()
    }

    pub fn set_transport(&self, transport: Arc<dyn VoiceHandle>) {
        *self.transport.write() = Some(transport);
    }

    /// Devuelve el transporte del guild, conectando con `connect` si no hay.
    ///
    /// Las peticiones concurrentes sobre un guild sin voz esperan a la
    /// primera conexión y la reutilizan: `connect` corre como mucho una vez.
    pub async fn ensure_transport<F, Fut, E>(&self, connect: F) -> Result<Arc<dyn VoiceHandle>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn VoiceHandle>, E>>,
    {
        let _join = self.join_lock.lock().await;
        if let Some(transport) = self.transport() {
            debug!("Guild {} ya tiene conexión de voz", self.guild_id);
            return Ok(transport);
        }

        let transport = connect().await?;
        self.set_transport(transport.clone());
        Ok(transport)
    }

    pub fn clear_transport(&self) -> Option<Arc<dyn VoiceHandle>> {
        self.transport.write().take()
    }

    pub async fn transport_is_playing(&self) -> bool {
        match self.transport() {
            Some(transport) => transport.is_playing().await,
            None => false,
        }
    }

    pub fn signal(&self) -> &Arc<AdvanceSignal> {
        &self.signal
    }

    pub fn playlist(&self) -> &FallbackPlaylist {
        &self.playlist
    }

    /// Reinicio completo de la sesión (p. ej. el bot salió del canal de voz).
    ///
    /// Nunca se usa al avanzar de track. El ciclo en curso recibe
    /// [`AdvanceReason::Cancelled`](super::signal::AdvanceReason::Cancelled)
    /// y termina sin buscar relleno.
    pub async fn reset_state(&self) {
        let mut queue = self.queue.lock().await;
        let dropped = queue.len();
        queue.clear();

        {
            let mut session = self.session.lock();
            session.current = None;
            session.paused = false;
            session.status_message = None;
            session.reset_votes();
        }

        self.signal.cancel();
        info!(
            "🔄 Estado reiniciado en guild {} ({} en cola descartados)",
            self.guild_id, dropped
        );
    }
}

/// Registro de estados por guild, creados bajo demanda y vivos todo el proceso.
pub struct GuildRegistry {
    states: DashMap<GuildId, Arc<GuildPlaybackState>>,
    fallback_mode: FallbackMode,
}

impl GuildRegistry {
    pub fn new(fallback_mode: FallbackMode) -> Self {
        Self {
            states: DashMap::new(),
            fallback_mode,
        }
    }

    pub fn get_or_create(&self, guild_id: GuildId) -> Arc<GuildPlaybackState> {
        self.states
            .entry(guild_id)
            .or_insert_with(|| {
                debug!("Creando estado de reproducción para guild {}", guild_id);
                Arc::new(GuildPlaybackState::new(guild_id, self.fallback_mode))
            })
            .clone()
    }

    pub fn get(&self, guild_id: GuildId) -> Option<Arc<GuildPlaybackState>> {
        self.states.get(&guild_id).map(|s| s.clone())
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
