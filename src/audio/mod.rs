//! # Audio Module
//!
//! Per-guild playback core of the jukebox.
//!
//! ## Architecture
//!
//! ### [`state`] - Guild Playback State
//! - One [`state::GuildPlaybackState`] per guild, kept in a [`state::GuildRegistry`]
//! - Owns the request queue (behind the guild's mutation lock), the current
//!   track, pause flag, vote sets and the voice transport
//!
//! ### [`engine`] - Playback Engine
//! - `Idle → Starting → Playing ⇄ Paused → Finishing → (Starting | Idle)`
//! - A single explicit loop per guild: play, await the advance signal,
//!   archive, pick the next track (queue head, else fallback playlist)
//!
//! ### [`coordinator`] - Vote/Interaction Coordinator
//! - Turns button presses into pause toggles and skips, honoring requester
//!   privilege and majority votes
//!
//! ### [`signal`] - Advance Signal
//! - Re-armable one-shot that both natural end and skip resolve; end
//!   callbacks are bound to the cycle that armed them
//!
//! ### [`playlist`] - Fallback Playlist
//! - Shuffled rotation over the catalog without repeats
//!
//! ### [`transport`] - Voice Transport
//! - [`transport::VoiceHandle`] seam, with a songbird-backed implementation
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use jukebox_bot::audio::{engine::PlaybackEngine, state::GuildRegistry};
//! use jukebox_bot::config::FallbackMode;
//! use serenity::all::{ChannelId, GuildId};
//!
//! # async fn example(engine: PlaybackEngine, track: jukebox_bot::audio::track::Track) {
//! let registry = GuildRegistry::new(FallbackMode::Shuffle);
//! let state = registry.get_or_create(GuildId::new(123456789));
//!
//! // Reproduce ya si el guild está libre, si no lo encola
//! engine.enqueue_or_play(&state, ChannelId::new(42), track).await;
//! # }
//! ```

pub mod coordinator;
pub mod engine;
pub mod playlist;
pub mod signal;
pub mod state;
pub mod track;
pub mod transport;
