//! Playback error types (thiserror-based).

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// The engine could not open or decode the source.
    #[error("Failed to load {uri}: {reason}")]
    LoadFailure { uri: String, reason: String },

    /// play/pause/seek was rejected by the engine.
    #[error("{command} failed: {reason}")]
    CommandFailure {
        command: &'static str,
        reason: String,
    },

    #[error("Unsupported audio URI: {0}")]
    UnsupportedUri(String),

    /// The engine thread is gone.
    #[error("Playback engine unavailable")]
    EngineUnavailable,
}
