#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use jukebox_bot::{
    audio::{
        coordinator::InteractionCoordinator,
        engine::PlaybackEngine,
        signal::{AdvanceReason, EndNotifier},
        state::GuildPlaybackState,
        track::{Track, TrackOrigin},
        transport::VoiceHandle,
    },
    catalog::{CatalogClient, CatalogRecord},
    config::FallbackMode,
    error::TransportError,
    sources::{AudioInfo, AudioResolver, MetadataMatch, MetadataSearch},
    ui::{MessageRef, Messenger, TrackStatus},
};
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId, MessageId, UserId};
use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

pub const TEXT_CHANNEL: u64 = 42;

pub fn track(title: &str, requester_id: u64) -> Track {
    Track {
        catalog_id: format!("id-{}", title),
        title: title.to_string(),
        artist: "Artist".to_string(),
        thumbnail: None,
        source_url: format!("https://www.youtube.com/watch?v={}", title.replace(' ', "")),
        requester: format!("user{}", requester_id),
        requester_id: UserId::new(requester_id),
        origin: TrackOrigin::Requested,
        status_message: None,
        request_channel: None,
        requested_at: Utc::now(),
    }
}

pub fn record(id: &str) -> CatalogRecord {
    CatalogRecord {
        catalog_id: id.to_string(),
        title: format!("Song {}", id),
        artist: "Artist".to_string(),
        thumbnail: None,
        source_url: format!("https://www.youtube.com/watch?v={}", id),
        requester: "ana".to_string(),
        requester_id: 7,
        last_played: None,
    }
}

/// Espera hasta que `cond` se cumpla o falla tras 2 segundos
pub async fn wait_until<F: Fn() -> bool>(what: &str, cond: F) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !cond() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for: {}", what);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

// Catálogo

#[derive(Default)]
pub struct MemoryCatalog {
    pub records: Mutex<HashMap<String, CatalogRecord>>,
    pub saves: Mutex<Vec<CatalogRecord>>,
}

impl MemoryCatalog {
    pub fn with(records: Vec<CatalogRecord>) -> Self {
        let catalog = Self::default();
        for r in records {
            catalog.records.lock().insert(r.catalog_id.clone(), r);
        }
        catalog
    }

    pub fn saved_titles(&self) -> Vec<String> {
        self.saves.lock().iter().map(|r| r.title.clone()).collect()
    }
}

#[async_trait]
impl CatalogClient for MemoryCatalog {
    async fn find_by_key(&self, catalog_id: &str) -> Result<Option<CatalogRecord>> {
        Ok(self.records.lock().get(catalog_id).cloned())
    }

    async fn find_by_query(&self, query: &str) -> Result<Option<CatalogRecord>> {
        let query = query.to_lowercase();
        Ok(self
            .records
            .lock()
            .values()
            .find(|r| r.title.to_lowercase() == query)
            .cloned())
    }

    async fn save(&self, record: CatalogRecord) -> Result<()> {
        self.saves.lock().push(record.clone());
        self.records.lock().insert(record.catalog_id.clone(), record);
        Ok(())
    }

    async fn random_or_next(&self, exclude_last: Option<&str>) -> Result<Option<CatalogRecord>> {
        let records = self.records.lock();
        let picked = records
            .values()
            .find(|r| Some(r.catalog_id.as_str()) != exclude_last)
            .or_else(|| records.values().next())
            .cloned();
        Ok(picked)
    }

    async fn all_tracks(&self) -> Result<Vec<CatalogRecord>> {
        let mut all: Vec<_> = self.records.lock().values().cloned().collect();
        all.sort_by(|a, b| a.catalog_id.cmp(&b.catalog_id));
        Ok(all)
    }
}

// Fuentes

/// Resolución de audio con fuentes "muertas" configurables
#[derive(Default)]
pub struct FakeAudio {
    pub dead: Mutex<HashSet<String>>,
    /// Respuesta fija por consulta; si no hay, se deriva de la consulta
    pub answers: Mutex<HashMap<String, AudioInfo>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeAudio {
    pub fn kill(&self, query: &str) {
        self.dead.lock().insert(query.to_string());
    }

    pub fn answer(&self, query: &str, info: AudioInfo) {
        self.answers.lock().insert(query.to_string(), info);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl AudioResolver for FakeAudio {
    async fn resolve(&self, url_or_query: &str) -> Result<Option<AudioInfo>> {
        self.calls.lock().push(url_or_query.to_string());

        if self.dead.lock().contains(url_or_query) {
            return Ok(None);
        }
        if let Some(info) = self.answers.lock().get(url_or_query) {
            return Ok(Some(info.clone()));
        }

        Ok(Some(AudioInfo {
            canonical_url: url_or_query.to_string(),
            stream_url: format!("stream://{}", url_or_query),
            title: url_or_query.to_string(),
            thumbnail: None,
        }))
    }
}

#[derive(Default)]
pub struct FakeMetadata {
    pub matches: Mutex<HashMap<String, MetadataMatch>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeMetadata {
    pub fn answer(&self, query: &str, meta: MetadataMatch) {
        self.matches.lock().insert(query.to_string(), meta);
    }
}

#[async_trait]
impl MetadataSearch for FakeMetadata {
    async fn search(&self, query: &str) -> Result<Option<MetadataMatch>> {
        self.calls.lock().push(query.to_string());
        Ok(self.matches.lock().get(query).cloned())
    }
}

// Transporte

#[derive(Default)]
struct VoiceState {
    playing: bool,
    paused: bool,
    notifier: Option<EndNotifier>,
    streams: Vec<String>,
    fail_next: bool,
}

/// Conexión de voz simulada; `finish` emula el fin natural del stream
#[derive(Default)]
pub struct FakeVoice {
    inner: Mutex<VoiceState>,
}

impl FakeVoice {
    pub fn finish(&self) -> bool {
        let notifier = {
            let mut inner = self.inner.lock();
            inner.playing = false;
            inner.paused = false;
            inner.notifier.take()
        };
        notifier.map_or(false, |n| n.notify(AdvanceReason::Finished))
    }

    pub fn fail_next_play(&self) {
        self.inner.lock().fail_next = true;
    }

    pub fn streams(&self) -> Vec<String> {
        self.inner.lock().streams.clone()
    }

    pub fn is_active(&self) -> bool {
        let inner = self.inner.lock();
        inner.playing || inner.paused
    }

    pub fn is_paused(&self) -> bool {
        self.inner.lock().paused
    }
}

#[async_trait]
impl VoiceHandle for FakeVoice {
    async fn play(&self, stream_url: &str, on_end: EndNotifier) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();
        if inner.fail_next {
            inner.fail_next = false;
            return Err(TransportError::Stream("boom".to_string()));
        }
        inner.playing = true;
        inner.paused = false;
        inner.notifier = Some(on_end);
        inner.streams.push(stream_url.to_string());
        Ok(())
    }

    async fn pause(&self) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();
        inner.playing = false;
        inner.paused = true;
        Ok(())
    }

    async fn resume(&self) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();
        inner.playing = true;
        inner.paused = false;
        Ok(())
    }

    async fn stop(&self) -> Result<(), TransportError> {
        // Como songbird: parar un track también dispara su fin
        let notifier = {
            let mut inner = self.inner.lock();
            inner.playing = false;
            inner.paused = false;
            inner.notifier.take()
        };
        if let Some(n) = notifier {
            n.notify(AdvanceReason::Finished);
        }
        Ok(())
    }

    async fn is_playing(&self) -> bool {
        self.is_active()
    }
}

// Mensajería

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Status { message: u64, title: String, status: TrackStatus },
    Edit { message: u64, title: String, status: TrackStatus },
    Text { channel: u64, content: String },
    Reaction { message: u64, emoji: String },
    ClearReactions { message: u64 },
}

#[derive(Default)]
pub struct RecordingMessenger {
    next_id: AtomicU64,
    pub log: Mutex<Vec<Sent>>,
}

impl RecordingMessenger {
    pub fn events(&self) -> Vec<Sent> {
        self.log.lock().clone()
    }

    pub fn has(&self, event: &Sent) -> bool {
        self.log.lock().contains(event)
    }

    pub fn texts(&self) -> Vec<String> {
        self.log
            .lock()
            .iter()
            .filter_map(|e| match e {
                Sent::Text { content, .. } => Some(content.clone()),
                _ => None,
            })
            .collect()
    }

    /// Avisos de texto enviados a `channel`
    pub fn texts_in(&self, channel: u64) -> Vec<String> {
        self.log
            .lock()
            .iter()
            .filter_map(|e| match e {
                Sent::Text { channel: c, content } if *c == channel => Some(content.clone()),
                _ => None,
            })
            .collect()
    }

    /// Último estado renderizado para `title`
    pub fn last_status(&self, title: &str) -> Option<TrackStatus> {
        self.log.lock().iter().rev().find_map(|e| match e {
            Sent::Status { title: t, status, .. } | Sent::Edit { title: t, status, .. }
                if t == title =>
            {
                Some(*status)
            }
            _ => None,
        })
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_status(
        &self,
        channel: ChannelId,
        track: &Track,
        status: TrackStatus,
    ) -> Result<MessageRef> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.lock().push(Sent::Status {
            message: id,
            title: track.title.clone(),
            status,
        });
        Ok(MessageRef {
            channel_id: channel,
            message_id: MessageId::new(id),
        })
    }

    async fn edit_status(&self, message: MessageRef, track: &Track, status: TrackStatus) -> Result<()> {
        self.log.lock().push(Sent::Edit {
            message: message.message_id.get(),
            title: track.title.clone(),
            status,
        });
        Ok(())
    }

    async fn send_text(&self, channel: ChannelId, content: &str) -> Result<()> {
        self.log.lock().push(Sent::Text {
            channel: channel.get(),
            content: content.to_string(),
        });
        Ok(())
    }

    async fn add_reaction(&self, message: MessageRef, emoji: &str) -> Result<()> {
        self.log.lock().push(Sent::Reaction {
            message: message.message_id.get(),
            emoji: emoji.to_string(),
        });
        Ok(())
    }

    async fn clear_reactions(&self, message: MessageRef) -> Result<()> {
        self.log.lock().push(Sent::ClearReactions {
            message: message.message_id.get(),
        });
        Ok(())
    }
}

/// Guild listo para reproducir, con todas las piezas simuladas a mano
pub struct Harness {
    pub state: Arc<GuildPlaybackState>,
    pub engine: PlaybackEngine,
    pub coordinator: InteractionCoordinator,
    pub catalog: Arc<MemoryCatalog>,
    pub audio: Arc<FakeAudio>,
    pub voice: Arc<FakeVoice>,
    pub messenger: Arc<RecordingMessenger>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_catalog(Vec::new())
    }

    pub fn with_catalog(records: Vec<CatalogRecord>) -> Self {
        let catalog = Arc::new(MemoryCatalog::with(records));
        let audio = Arc::new(FakeAudio::default());
        let voice = Arc::new(FakeVoice::default());
        let messenger = Arc::new(RecordingMessenger::default());

        let state = Arc::new(GuildPlaybackState::new(GuildId::new(1), FallbackMode::Shuffle));
        state.set_transport(voice.clone());

        let engine = PlaybackEngine::new(catalog.clone(), audio.clone(), messenger.clone(), 3);
        let coordinator = InteractionCoordinator::new(messenger.clone());

        Self {
            state,
            engine,
            coordinator,
            catalog,
            audio,
            voice,
            messenger,
        }
    }

    pub fn channel(&self) -> ChannelId {
        ChannelId::new(TEXT_CHANNEL)
    }

    pub fn current_title(&self) -> Option<String> {
        self.state.current().map(|t| t.title)
    }

    /// `current` vacío implica transporte parado
    pub fn assert_idle_invariant(&self) {
        if self.state.current().is_none() {
            assert!(
                !self.voice.is_active(),
                "transport still active without a current track"
            );
        }
    }
}
