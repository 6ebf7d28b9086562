//! # UI Module
//!
//! Everything the bot renders in a text channel: the per-track status
//! message (queued / now playing / paused / played / skipped), its control
//! buttons, and the vote reactions. The playback core only talks to the
//! [`Messenger`] trait; [`DiscordMessenger`] is the serenity-backed
//! implementation used in production.

pub mod buttons;
pub mod embeds;

use anyhow::Result;
use async_trait::async_trait;
use serenity::{
    all::{ChannelId, Http, MessageId, ReactionType},
    builder::{CreateMessage, EditMessage},
};
use std::sync::Arc;
use tracing::debug;

use crate::audio::track::Track;

/// Reference to a rendered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

/// Lifecycle status rendered on a track's status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackStatus {
    Queued,
    NowPlaying,
    Paused,
    Played,
    Skipped,
}

impl TrackStatus {
    /// Terminal statuses carry no controls.
    pub fn is_terminal(self) -> bool {
        matches!(self, TrackStatus::Played | TrackStatus::Skipped)
    }
}

/// Messaging capability used by the playback core.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_status(
        &self,
        channel: ChannelId,
        track: &Track,
        status: TrackStatus,
    ) -> Result<MessageRef>;

    async fn edit_status(&self, message: MessageRef, track: &Track, status: TrackStatus) -> Result<()>;

    async fn send_text(&self, channel: ChannelId, content: &str) -> Result<()>;

    async fn add_reaction(&self, message: MessageRef, emoji: &str) -> Result<()>;

    async fn clear_reactions(&self, message: MessageRef) -> Result<()>;
}

/// [`Messenger`] over the Discord REST API.
pub struct DiscordMessenger {
    http: Arc<Http>,
}

impl DiscordMessenger {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Messenger for DiscordMessenger {
    async fn send_status(
        &self,
        channel: ChannelId,
        track: &Track,
        status: TrackStatus,
    ) -> Result<MessageRef> {
        let message = channel
            .send_message(
                &self.http,
                CreateMessage::new()
                    .embed(embeds::create_status_embed(track, status))
                    .components(buttons::create_player_buttons(status)),
            )
            .await?;

        Ok(MessageRef {
            channel_id: channel,
            message_id: message.id,
        })
    }

    async fn edit_status(&self, message: MessageRef, track: &Track, status: TrackStatus) -> Result<()> {
        debug!("✏️ Actualizando estado de {} a {:?}", track.title, status);
        message
            .channel_id
            .edit_message(
                &self.http,
                message.message_id,
                EditMessage::new()
                    .embed(embeds::create_status_embed(track, status))
                    .components(buttons::create_player_buttons(status)),
            )
            .await?;
        Ok(())
    }

    async fn send_text(&self, channel: ChannelId, content: &str) -> Result<()> {
        channel.say(&self.http, content).await?;
        Ok(())
    }

    async fn add_reaction(&self, message: MessageRef, emoji: &str) -> Result<()> {
        message
            .channel_id
            .create_reaction(
                &self.http,
                message.message_id,
                ReactionType::Unicode(emoji.to_string()),
            )
            .await?;
        Ok(())
    }

    async fn clear_reactions(&self, message: MessageRef) -> Result<()> {
        message
            .channel_id
            .delete_reactions(&self.http, message.message_id)
            .await?;
        Ok(())
    }
}
