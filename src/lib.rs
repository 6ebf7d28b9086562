//! Discord jukebox: a shared per-guild music queue with vote-based controls
//! and an endless fallback playlist drawn from previously played songs.

pub mod audio;
pub mod bot;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod sources;
pub mod ui;
