//! What a player widget needs to draw. Plain data, no widgets.

use super::session::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SurfaceState {
    pub position_ms: u64,
    pub duration_ms: u64,
    pub is_playing: bool,
    pub is_scrubbing: bool,
}

impl SurfaceState {
    pub fn from_session(state: &SessionState) -> Self {
        Self {
            position_ms: state.position_ms,
            duration_ms: state.duration_ms,
            is_playing: state.is_playing,
            is_scrubbing: state.is_scrubbing,
        }
    }

    /// Fill of the seek bar, 0.0..=1.0. Zero while duration is unknown.
    pub fn progress(&self) -> f32 {
        if self.duration_ms == 0 {
            return 0.0;
        }
        (self.position_ms as f64 / self.duration_ms as f64).clamp(0.0, 1.0) as f32
    }

    pub fn play_label(&self) -> &'static str {
        if self.is_playing { "Playing" } else { "Paused" }
    }

    pub fn time_label(&self) -> String {
        format!(
            "{} / {}",
            format_time(self.position_ms),
            format_time(self.duration_ms)
        )
    }
}

/// `m:ss`, seconds truncated.
pub fn format_time(ms: u64) -> String {
    let s = ms / 1000;
    let m = s / 60;
    let s = s % 60;
    format!("{m}:{s:02}")
}
