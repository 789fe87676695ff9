//! gui/update/playback.rs
//! GUI -> playback controller bridge
//!
//! - GUI never touches the engine directly; every intent goes to the story's controller.
//! - Nothing here flips play state: the controller waits for engine status.
//! - The seek slider has no separate "pressed" event, so the first change of a drag
//!   begins the scrub.

use iced::Task;
use tracing::debug;

use super::super::state::{Message, Storynook};

pub(crate) fn pump_all(state: &mut Storynook) -> Task<Message> {
    for (i, player) in state.players.iter_mut().enumerate() {
        let before = player.phase();
        player.pump();

        let after = player.phase();
        if after != before {
            debug!(story = i, uri = ?player.source_uri(), ?before, ?after, "player phase changed");
        }
    }
    Task::none()
}

pub(crate) fn toggle(state: &mut Storynook, index: usize) -> Task<Message> {
    let Some(player) = state.players.get_mut(index) else {
        return Task::none();
    };

    debug!(story = index, "toggle playback");
    player.toggle_playback();

    Task::none()
}

/// Seek slider changed: preview only (UI updates, no engine command).
pub(crate) fn scrub_moved(state: &mut Storynook, index: usize, ratio: f32) -> Task<Message> {
    let Some(player) = state.players.get_mut(index) else {
        return Task::none();
    };

    if !player.surface().is_scrubbing {
        player.begin_scrub();
    }
    player.update_scrub(ratio);

    Task::none()
}

/// Seek slider released: commit the last preview to the engine.
pub(crate) fn scrub_released(state: &mut Storynook, index: usize) -> Task<Message> {
    if let Some(player) = state.players.get_mut(index) {
        player.end_scrub();
    }
    Task::none()
}
