//! gui/update/mod.rs
//! Update logic (router).
//! Mutates state in response to `Message` events.

use iced::Task;

use super::state::{Message, Storynook};

mod playback;

pub(crate) fn update(state: &mut Storynook, message: Message) -> Task<Message> {
    match message {
        Message::TickPlayback => playback::pump_all(state),

        Message::TogglePlayback(i) => playback::toggle(state, i),

        // Seek: preview while dragging, commit on release
        Message::ScrubMoved(i, ratio) => playback::scrub_moved(state, i, ratio),
        Message::ScrubReleased(i) => playback::scrub_released(state, i),
    }
}
