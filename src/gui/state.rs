//! GUI state + messages.
//! Pure data definitions used by update + view.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::Settings;
use crate::core::playback::{PlaybackController, PlaybackEngine, PlaybackStatus};
use crate::core::types::Story;

/// App state
pub(crate) struct Storynook {
    pub stories: Vec<Story>,

    /// One player per story, same index. Each owns its own engine session.
    pub players: Vec<PlaybackController>,

    /// How often engine status is pumped into the players.
    pub tick: Duration,
}

impl Storynook {
    /// Every story's player attaches its source right away, like a mounted widget would.
    pub(crate) fn new(
        stories: Vec<Story>,
        engine: Arc<dyn PlaybackEngine>,
        settings: &Settings,
    ) -> Self {
        let players = stories
            .iter()
            .map(|story| {
                let mut player =
                    PlaybackController::new(Arc::clone(&engine), settings.audio_mode);
                player.set_status_listener(finish_logger(story.title.clone()));
                player.attach(story.audio_uri.clone());
                player
            })
            .collect();

        Self {
            stories,
            players,
            tick: settings.tick(),
        }
    }
}

/// Logs once each time a story plays through to its end.
fn finish_logger(title: String) -> impl FnMut(&PlaybackStatus) + Send + 'static {
    let mut was_playing = false;
    move |status| {
        let at_end = status.duration_ms > 0 && status.position_ms >= status.duration_ms;
        if was_playing && !status.is_playing && at_end {
            info!(story = %title, "story finished");
        }
        was_playing = status.is_playing;
    }
}

/// Message = “something happened”.
/// Player messages carry the story index.
#[derive(Debug, Clone)]
pub(crate) enum Message {
    TickPlayback,

    TogglePlayback(usize),

    /// Seek slider dragged (normalized 0..=1).
    ScrubMoved(usize, f32),
    /// Seek slider released.
    ScrubReleased(usize),
}
