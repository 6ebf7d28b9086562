use serenity::{
    all::ButtonStyle,
    builder::{CreateActionRow, CreateButton},
};

use super::TrackStatus;

/// IDs personalizados para los botones
pub mod button_ids {
    pub const PLAY_PAUSE: &str = "play_pause_button";
    pub const SKIP: &str = "skip_button";
}

/// Acción solicitada desde un botón del reproductor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    PlayPause,
    Skip,
}

impl ButtonAction {
    pub fn from_custom_id(custom_id: &str) -> Option<Self> {
        match custom_id {
            button_ids::PLAY_PAUSE => Some(Self::PlayPause),
            button_ids::SKIP => Some(Self::Skip),
            _ => None,
        }
    }

    /// Reacción que deja constancia de un voto pendiente
    pub fn vote_emoji(self) -> &'static str {
        match self {
            Self::PlayPause => "⏸️",
            Self::Skip => "⏭️",
        }
    }
}

/// Etiqueta del botón de pausa según el estado
fn play_pause_label(status: TrackStatus) -> &'static str {
    match status {
        TrackStatus::Paused => "▶",
        _ => "❚❚",
    }
}

/// Crea los controles del reproductor; solo el track activo lleva botones
pub fn create_player_buttons(status: TrackStatus) -> Vec<CreateActionRow> {
    if !matches!(status, TrackStatus::NowPlaying | TrackStatus::Paused) {
        return Vec::new();
    }

    let play_pause_btn = CreateButton::new(button_ids::PLAY_PAUSE)
        .label(play_pause_label(status))
        .style(ButtonStyle::Secondary);

    let skip_btn = CreateButton::new(button_ids::SKIP)
        .label("▶▶")
        .style(ButtonStyle::Secondary);

    vec![CreateActionRow::Buttons(vec![play_pause_btn, skip_btn])]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_custom_ids() {
        assert_eq!(
            ButtonAction::from_custom_id("play_pause_button"),
            Some(ButtonAction::PlayPause)
        );
        assert_eq!(ButtonAction::from_custom_id("skip_button"), Some(ButtonAction::Skip));
        assert_eq!(ButtonAction::from_custom_id("music_stop"), None);
    }

    #[test]
    fn only_active_statuses_carry_controls() {
        assert_eq!(create_player_buttons(TrackStatus::NowPlaying).len(), 1);
        assert_eq!(create_player_buttons(TrackStatus::Paused).len(), 1);
        assert!(create_player_buttons(TrackStatus::Queued).is_empty());
        assert!(create_player_buttons(TrackStatus::Played).is_empty());
        assert!(create_player_buttons(TrackStatus::Skipped).is_empty());
    }

    #[test]
    fn pause_label_flips_when_paused() {
        assert_eq!(play_pause_label(TrackStatus::NowPlaying), "❚❚");
        assert_eq!(play_pause_label(TrackStatus::Paused), "▶");
    }

    #[test]
    fn buttons_serialize_with_ids() {
        let rows = create_player_buttons(TrackStatus::NowPlaying);
        let json = serde_json::to_value(&rows[0]).unwrap();
        let components = json["components"].as_array().unwrap();

        assert_eq!(components[0]["custom_id"], "play_pause_button");
        assert_eq!(components[1]["custom_id"], "skip_button");
    }
}
