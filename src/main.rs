use anyhow::Result;
use serenity::{http::Http, model::gateway::GatewayIntents, Client};
use songbird::SerenityInit;
use std::sync::Arc;
use tracing::{error, info, warn};

use jukebox_bot::{
    audio::{coordinator::InteractionCoordinator, engine::PlaybackEngine, state::GuildRegistry},
    bot::JukeboxBot,
    cache::SearchCache,
    catalog::JsonCatalog,
    config::Config,
    sources::{SpotifySearch, TrackResolver, YtDlpResolver},
    ui::DiscordMessenger,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("jukebox_bot=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎵 Iniciando Jukebox Bot v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración
    let config = Config::load()?;
    info!("{}", config.summary());

    // Catálogo persistente
    let catalog = Arc::new(JsonCatalog::new(config.data_dir.clone()).await?);
    info!("📚 Catálogo cargado: {} canciones", catalog.len());

    // Fuentes externas
    let metadata = Arc::new(SpotifySearch::new(
        config.spotify_client_id.clone(),
        config.spotify_client_secret.clone(),
    )?);
    let audio = Arc::new(YtDlpResolver::new(
        config.ytdlp_path.clone(),
        config.search_concurrency,
    ));
    match audio.verify().await {
        Ok(version) => info!("✅ yt-dlp {}", version),
        Err(e) => warn!("⚠️ yt-dlp no disponible, las peticiones fallarán: {:?}", e),
    }

    let cache = SearchCache::with_ttl_secs(config.cache_size, config.cache_ttl);
    let resolver = Arc::new(TrackResolver::new(
        catalog.clone(),
        metadata,
        audio.clone(),
        cache,
    ));

    // Núcleo de reproducción
    let messenger = Arc::new(DiscordMessenger::new(Arc::new(Http::new(
        &config.discord_token,
    ))));
    let engine = PlaybackEngine::new(
        catalog,
        audio,
        messenger.clone(),
        config.max_consecutive_failures,
    );
    let coordinator = InteractionCoordinator::new(messenger);
    let registry = Arc::new(GuildRegistry::new(config.fallback_mode));

    // Configurar intents mínimos necesarios
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::MESSAGE_CONTENT;

    let token = config.discord_token.clone();
    let handler = JukeboxBot::new(config, registry, resolver, engine, coordinator);

    // Construir cliente
    let mut client = Client::builder(&token, intents)
        .event_handler(handler)
        .register_songbird()
        .await?;

    // Manejar shutdown graceful
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Error al registrar Ctrl+C: {:?}", e);
            return;
        }
        info!("⚠️ Señal de shutdown recibida, cerrando...");
        shard_manager.shutdown_all().await;
    });

    // Iniciar bot
    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}
