//! Player bar widget.
//!
//! Emits only Messages (no engine calls, no decoding).

use iced::widget::{Row, button, column, row, slider, text};
use iced::{Alignment, Length};

use super::super::state::Message;
use super::constants::{PLAY_BUTTON_W, SEEK_STEP, TIME_TEXT};
use crate::core::playback::SurfaceState;

pub(crate) fn player_bar(index: usize, surface: SurfaceState) -> Row<'static, Message> {
    let play_label = if surface.is_playing { "Pause" } else { "Play" };
    let play_btn = button(text(play_label))
        .on_press(Message::TogglePlayback(index))
        .width(Length::Fixed(PLAY_BUTTON_W));

    // Controller ignores scrubs until the duration is known, so the slider can stay wired.
    let seek = slider(0.0..=1.0, surface.progress(), move |ratio| {
        Message::ScrubMoved(index, ratio)
    })
    .on_release(Message::ScrubReleased(index))
    .step(SEEK_STEP)
    .width(Length::Fill);

    row![
        play_btn,
        column![
            seek,
            text(format!("{} · {}", surface.play_label(), surface.time_label())).size(TIME_TEXT),
        ]
        .spacing(4)
        .width(Length::Fill),
    ]
    .spacing(16)
    .align_y(Alignment::Center)
}
