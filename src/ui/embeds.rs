use serenity::{
    all::Colour,
    builder::{CreateEmbed, CreateEmbedFooter},
};

use super::TrackStatus;
use crate::audio::track::Track;

const BLANK_CHAR: &str = "\u{2003}\u{2800}";
const SEPARATOR: &str = "\u{2800}•\u{2800}";
const DEFAULT_THUMBNAIL_URL: &str = "https://i.ibb.co/m937VW1/add.png";

/// Paleta de colores por estado
pub mod colors {
    use serenity::all::Colour;

    pub const NOW_PLAYING: Colour = Colour::new(0x1DB954);
    pub const PAUSED: Colour = Colour::new(0xFFA500);
    pub const QUEUED: Colour = Colour::new(0xFFFFFF);
    pub const PLAYED: Colour = Colour::new(0x000000);
    pub const SKIPPED: Colour = Colour::new(0x6C757D);
}

/// Iconos del footer por estado
mod footer_icons {
    pub const NOW_PLAYING: &str = "https://i.ibb.co/yP0591q/nowp5.gif";
    pub const PAUSED: &str = "https://i.ibb.co/2KtfHmw/pause-button.png";
    pub const QUEUED: &str = "https://i.ibb.co/m937VW1/add.png";
    pub const PLAYED: &str = "https://i.ibb.co/9Wc3xNw/check.png";
}

/// Crea el embed de estado de un track
pub fn create_status_embed(track: &Track, status: TrackStatus) -> CreateEmbed {
    CreateEmbed::default()
        .description(create_description(track))
        .colour(status_colour(status))
        .thumbnail(track.thumbnail.as_deref().unwrap_or(DEFAULT_THUMBNAIL_URL))
        .footer(CreateEmbedFooter::new(footer_text(track, status)).icon_url(footer_icon(status)))
}

pub fn create_description(track: &Track) -> String {
    format!(
        "# {}\n**{}**\n\u{2800}\n{}",
        track.title,
        track.artist,
        BLANK_CHAR.repeat(17)
    )
}

/// Texto del footer, p. ej. `Now Playing • @ana` o `Played from Playlist • @ana`
pub fn footer_text(track: &Track, status: TrackStatus) -> String {
    let label = match status {
        TrackStatus::Queued => "Queued",
        TrackStatus::NowPlaying => "Now Playing",
        TrackStatus::Paused => "Paused",
        TrackStatus::Played => "Played",
        TrackStatus::Skipped => "Skipped",
    };

    // Las peticiones en cola nunca son de la playlist
    let origin = if track.is_fallback() && status != TrackStatus::Queued {
        " from Playlist"
    } else {
        ""
    };

    format!("{}{}{}@{}", label, origin, SEPARATOR, track.requester)
}

fn status_colour(status: TrackStatus) -> Colour {
    match status {
        TrackStatus::Queued => colors::QUEUED,
        TrackStatus::NowPlaying => colors::NOW_PLAYING,
        TrackStatus::Paused => colors::PAUSED,
        TrackStatus::Played => colors::PLAYED,
        TrackStatus::Skipped => colors::SKIPPED,
    }
}

fn footer_icon(status: TrackStatus) -> &'static str {
    match status {
        TrackStatus::Queued => footer_icons::QUEUED,
        TrackStatus::NowPlaying => footer_icons::NOW_PLAYING,
        TrackStatus::Paused => footer_icons::PAUSED,
        TrackStatus::Played | TrackStatus::Skipped => footer_icons::PLAYED,
    }
}
