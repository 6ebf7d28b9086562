use anyhow::Result;
use serenity::{
    model::{
        application::ComponentInteraction,
        channel::Message,
        guild::Guild,
        id::{ChannelId, GuildId, UserId},
        voice::VoiceState,
    },
    prelude::Context,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    audio::{
        engine::Enqueued,
        transport::{SongbirdHandle, VoiceHandle},
    },
    bot::JukeboxBot,
    ui::buttons::ButtonAction,
};

pub const NOT_IN_VOICE_MESSAGE: &str = "You need to be in a voice channel to request a song.";
pub const REQUEST_ERROR_MESSAGE: &str = "An error occurred while processing your request.";

/// Extrae la consulta de un mensaje con prefijo (`.never gonna give you up`).
pub fn parse_request<'a>(content: &'a str, prefix: &str) -> Option<&'a str> {
    let query = content.strip_prefix(prefix)?.trim();
    if query.is_empty() {
        None
    } else {
        Some(query)
    }
}

/// Maneja un mensaje de texto; sólo los que llevan prefijo son peticiones
pub async fn handle_message(ctx: &Context, msg: Message, bot: &JukeboxBot) -> Result<()> {
    if msg.author.bot {
        return Ok(());
    }

    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };

    let Some(query) = parse_request(&msg.content, &bot.config.command_prefix) else {
        return Ok(());
    };

    info!(
        "📝 Petición de {} en guild {}: {}",
        msg.author.name, guild_id, query
    );

    if bot.config.delete_requests {
        if let Err(e) = msg.delete(&ctx.http).await {
            warn!("No se pudo borrar el mensaje de petición: {}", e);
        }
    }

    let state = bot.registry.get_or_create(guild_id);

    if state.transport().is_none() {
        let Some(voice_channel) = get_user_voice_channel(ctx, guild_id, msg.author.id) else {
            msg.channel_id.say(&ctx.http, NOT_IN_VOICE_MESSAGE).await?;
            warn!("{} no está en un canal de voz", msg.author.name);
            return Ok(());
        };

        // Otra petición pudo conectar mientras tanto; se reutiliza su conexión
        let joined = state
            .ensure_transport(|| join_voice_channel(ctx, bot, guild_id, voice_channel))
            .await;
        if let Err(e) = joined {
            msg.channel_id.say(&ctx.http, REQUEST_ERROR_MESSAGE).await?;
            return Err(e);
        }
    }

    let requester = msg
        .member
        .as_ref()
        .and_then(|m| m.nick.clone())
        .unwrap_or_else(|| msg.author.display_name().to_string());

    let track = match bot.resolver.resolve(query, &requester, msg.author.id).await {
        Ok(track) => track,
        Err(e) => {
            warn!("⚠️ No se pudo resolver '{}': {}", query, e);
            msg.channel_id.say(&ctx.http, REQUEST_ERROR_MESSAGE).await?;
            return Ok(());
        }
    };

    match bot.engine.enqueue_or_play(&state, msg.channel_id, track).await {
        Enqueued::Queued { position } => debug!("Petición en cola, posición {}", position),
        Enqueued::Started(_) => debug!("Ciclo de reproducción iniciado en guild {}", guild_id),
    }

    Ok(())
}

/// Maneja los botones del mensaje de estado
pub async fn handle_component(
    ctx: &Context,
    component: ComponentInteraction,
    bot: &JukeboxBot,
) -> Result<()> {
    let Some(action) = ButtonAction::from_custom_id(&component.data.custom_id) else {
        debug!("Componente desconocido: {}", component.data.custom_id);
        return Ok(());
    };

    let guild_id = component
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Componente usado fuera de un servidor"))?;

    info!(
        "🔘 Botón {} presionado por {} en guild {}",
        component.data.custom_id, component.user.name, guild_id
    );

    // Confirmar antes de tocar el estado
    component.defer(&ctx.http).await?;

    let Some(state) = bot.registry.get(guild_id) else {
        return Ok(());
    };

    let listeners = count_listeners(ctx, guild_id);
    let outcome = bot
        .coordinator
        .on_button(&state, component.user.id, action, listeners)
        .await;

    debug!("Resultado de {:?}: {:?}", action, outcome);
    Ok(())
}

async fn join_voice_channel(
    ctx: &Context,
    bot: &JukeboxBot,
    guild_id: GuildId,
    channel_id: ChannelId,
) -> Result<Arc<dyn VoiceHandle>> {
    let manager = songbird::get(ctx)
        .await
        .ok_or_else(|| anyhow::anyhow!("Songbird no inicializado"))?;

    let handle = SongbirdHandle::connect(
        &manager,
        guild_id,
        channel_id,
        bot.http_client.clone(),
    )
    .await?;

    Ok(Arc::new(handle))
}

// Funciones auxiliares

fn get_user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;
    let channel_id = guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id);
    channel_id
}

/// Miembros (no bots) en el canal de voz del bot
fn count_listeners(ctx: &Context, guild_id: GuildId) -> usize {
    let bot_id = ctx.cache.current_user().id;
    let Some(guild) = guild_id.to_guild_cached(&ctx.cache) else {
        return 0;
    };

    let Some(channel) = guild
        .voice_states
        .get(&bot_id)
        .and_then(|voice_state| voice_state.channel_id)
    else {
        return 0;
    };

    let listeners = guild
        .voice_states
        .values()
        .filter(|voice_state| voice_state.channel_id == Some(channel))
        .filter(|voice_state| !is_bot(&guild, voice_state))
        .count();
    listeners
}

fn is_bot(guild: &Guild, voice_state: &VoiceState) -> bool {
    voice_state
        .member
        .as_ref()
        .map(|m| m.user.bot)
        .or_else(|| guild.members.get(&voice_state.user_id).map(|m| m.user.bot))
        .unwrap_or(false)
}
