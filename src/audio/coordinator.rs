use serenity::model::id::UserId;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{signal::AdvanceReason, state::GuildPlaybackState};
use crate::ui::{buttons::ButtonAction, Messenger, TrackStatus};

/// Votos necesarios según los oyentes (no bots) del canal de voz.
pub fn required_votes(listeners: usize) -> usize {
    if listeners <= 1 {
        1
    } else {
        2
    }
}

/// Resultado de procesar un botón.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonOutcome {
    /// No había track activo o el transporte no estaba disponible.
    Ignored,
    VoteRecorded { votes: usize, required: usize },
    Paused,
    Resumed,
    Skipped,
}

/// Traduce pulsaciones de botones en acciones sobre el estado de un guild.
pub struct InteractionCoordinator {
    messenger: Arc<dyn Messenger>,
}

impl InteractionCoordinator {
    pub fn new(messenger: Arc<dyn Messenger>) -> Self {
        Self { messenger }
    }

    /// Procesa el botón `action` pulsado por `actor`.
    ///
    /// La interacción ya debe estar confirmada (deferred) antes de llamar aquí.
    pub async fn on_button(
        &self,
        state: &GuildPlaybackState,
        actor: UserId,
        action: ButtonAction,
        listeners: usize,
    ) -> ButtonOutcome {
        if !state.has_current() {
            debug!("Botón {:?} sin track activo, ignorado", action);
            return ButtonOutcome::Ignored;
        }

        let required = required_votes(listeners);
        let approved = match action {
            ButtonAction::PlayPause => state.add_pause_vote(actor, required),
            ButtonAction::Skip => state.add_skip_vote(actor, required),
        };

        if !approved {
            let votes = match action {
                ButtonAction::PlayPause => state.pause_vote_count(),
                ButtonAction::Skip => state.skip_vote_count(),
            };
            info!("🗳️ Voto {:?} de {} ({}/{})", action, actor, votes, required);
            self.mark_vote(state, action).await;
            return ButtonOutcome::VoteRecorded { votes, required };
        }

        match action {
            ButtonAction::PlayPause => self.toggle_pause(state).await,
            ButtonAction::Skip => self.skip(state).await,
        }
    }

    async fn toggle_pause(&self, state: &GuildPlaybackState) -> ButtonOutcome {
        let Some(transport) = state.transport() else {
            return ButtonOutcome::Ignored;
        };

        let (outcome, status) = if state.is_paused() {
            if let Err(e) = transport.resume().await {
                warn!("No se pudo reanudar: {}", e);
                return ButtonOutcome::Ignored;
            }
            state.set_paused(false);
            info!("▶️ Reproducción reanudada");
            (ButtonOutcome::Resumed, TrackStatus::NowPlaying)
        } else if transport.is_playing().await {
            if let Err(e) = transport.pause().await {
                warn!("No se pudo pausar: {}", e);
                return ButtonOutcome::Ignored;
            }
            state.set_paused(true);
            info!("⏸️ Reproducción pausada");
            (ButtonOutcome::Paused, TrackStatus::Paused)
        } else {
            return ButtonOutcome::Ignored;
        };

        state.reset_votes();
        self.render(state, status).await;
        outcome
    }

    async fn skip(&self, state: &GuildPlaybackState) -> ButtonOutcome {
        let fired = state.signal().fire_current(AdvanceReason::Skipped);

        if let Some(transport) = state.transport() {
            if let Err(e) = transport.stop().await {
                warn!("No se pudo detener el track: {}", e);
            }
        }

        state.set_paused(false);
        state.reset_votes();

        if let Some(message) = state.status_message() {
            if let Err(e) = self.messenger.clear_reactions(message).await {
                debug!("No se pudieron quitar las reacciones: {}", e);
            }
        }

        if fired {
            info!("⏭️ Track saltado");
            ButtonOutcome::Skipped
        } else {
            ButtonOutcome::Ignored
        }
    }

    /// Re-renderiza el mensaje de estado y limpia las reacciones de voto.
    async fn render(&self, state: &GuildPlaybackState, status: TrackStatus) {
        let (Some(message), Some(track)) = (state.status_message(), state.current()) else {
            return;
        };

        if let Err(e) = self.messenger.edit_status(message, &track, status).await {
            warn!("No se pudo actualizar el estado: {}", e);
        }
        if let Err(e) = self.messenger.clear_reactions(message).await {
            debug!("No se pudieron quitar las reacciones: {}", e);
        }
    }

    async fn mark_vote(&self, state: &GuildPlaybackState, action: ButtonAction) {
        let Some(message) = state.status_message() else {
            return;
        };
        if let Err(e) = self.messenger.add_reaction(message, action.vote_emoji()).await {
            debug!("No se pudo añadir la reacción de voto: {}", e);
        }
    }
}
