//! # Bot Module
//!
//! Discord shell around the playback core.
//!
//! [`JukeboxBot`] implements Serenity's [`EventHandler`] and routes events:
//!
//! - Prefixed text messages become song requests: the query goes through the
//!   [`TrackResolver`] and the resolved track is handed to the
//!   [`PlaybackEngine`], joining the requester's voice channel on demand.
//! - Button presses on a status message go to the [`InteractionCoordinator`].
//! - When the bot is disconnected from voice the guild's session is reset.
//!
//! Guild state lives in a process-wide [`GuildRegistry`], created lazily per
//! guild and never dropped while the process runs.

use serenity::{
    all::{Context, EventHandler, Interaction, Message, Ready, VoiceState},
    async_trait,
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tracing::{debug, error, info};

pub mod handlers;

use crate::{
    audio::{
        coordinator::InteractionCoordinator, engine::PlaybackEngine, state::GuildRegistry,
    },
    config::Config,
    sources::TrackResolver,
};

/// Discord event handler for the jukebox.
pub struct JukeboxBot {
    /// Bot configuration loaded from environment variables
    config: Arc<Config>,
    /// Per-guild playback state
    registry: Arc<GuildRegistry>,
    resolver: Arc<TrackResolver>,
    engine: PlaybackEngine,
    coordinator: InteractionCoordinator,
    /// Client shared by every voice stream
    http_client: reqwest::Client,
    /// `ready` llega otra vez en cada reconexión del gateway
    maintenance_started: AtomicBool,
}

impl JukeboxBot {
    pub fn new(
        config: Config,
        registry: Arc<GuildRegistry>,
        resolver: Arc<TrackResolver>,
        engine: PlaybackEngine,
        coordinator: InteractionCoordinator,
    ) -> Self {
        Self {
            config: Arc::new(config),
            registry,
            resolver,
            engine,
            coordinator,
            http_client: reqwest::Client::new(),
            maintenance_started: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &GuildRegistry {
        &self.registry
    }
}

#[async_trait]
impl EventHandler for JukeboxBot {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        // Iniciar tareas de mantenimiento (una sola vez por proceso)
        if claim_once(&self.maintenance_started) {
            let resolver = self.resolver.clone();
            tokio::spawn(async move {
                maintenance_tasks(resolver).await;
            });
        } else {
            debug!("Reconexión: las tareas de mantenimiento ya están activas");
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if let Err(e) = handlers::handle_message(&ctx, msg, self).await {
            error!("Error manejando petición: {:?}", e);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Component(component) = interaction {
            if let Err(e) = handlers::handle_component(&ctx, component, self).await {
                error!("Error manejando componente: {:?}", e);
            }
        }
    }

    /// Resetea la sesión del guild cuando el bot sale del canal de voz.
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id || old.is_none() || new.channel_id.is_some() {
            return;
        }

        let Some(guild_id) = new.guild_id else {
            return;
        };

        info!("🔌 Bot desconectado en guild {}", guild_id);

        if let Some(state) = self.registry.get(guild_id) {
            state.clear_transport();
            state.reset_state().await;
        }

        if let Some(manager) = songbird::get(&ctx).await {
            if let Err(e) = manager.remove(guild_id).await {
                debug!("Llamada de voz ya cerrada en guild {}: {}", guild_id, e);
            }
        }
    }
}

/// `true` sólo para el primer llamador.
fn claim_once(flag: &AtomicBool) -> bool {
    !flag.swap(true, Ordering::AcqRel)
}

/// Tareas periódicas: por ahora sólo limpia entradas caducadas del caché de búsquedas.
async fn maintenance_tasks(resolver: Arc<TrackResolver>) {
    let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(3600)); // Cada hora

    loop {
        interval.tick().await;

        // Limpiar caché viejo
        resolver.cache().cleanup_old_entries();

        info!(
            "🧹 Tareas de mantenimiento completadas ({} búsquedas en caché)",
            resolver.cache().len()
        );
    }
}
