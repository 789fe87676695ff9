//! core/playback/mod.rs
//! Story playback core module.
//!
//! - `PlaybackEngine` is the seam to whatever actually makes sound.
//! - `session` is the pure state machine (event in, state + engine commands out).
//! - `PlaybackController` owns one session at a time and runs the commands.
//!
//! No Iced imports.

mod controller;
mod engine;
mod error;
mod probe;
mod session;
mod surface;

#[cfg(test)]
pub(crate) mod testing;

use serde::{Deserialize, Serialize};

pub use controller::PlaybackController;
pub use engine::RodioEngine;
pub use error::PlaybackError;
pub use session::Phase;
pub use surface::SurfaceState;

/// Opaque reference to one loaded source inside an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineHandle(u64);

impl EngineHandle {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// One status report from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackStatus {
    pub loaded: bool,
    pub position_ms: u64,
    /// 0 while the engine does not know it.
    pub duration_ms: u64,
    pub is_playing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadOptions {
    pub autoplay: bool,
}

/// Audio-session policy handed to the engine before a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioMode {
    /// Keep playing when the device is silenced or locked.
    pub plays_in_silent_mode: bool,
    pub stays_active_in_background: bool,
    /// Lower the volume of other audio on interruption instead of stopping it.
    pub duck_others: bool,
}

impl Default for AudioMode {
    fn default() -> Self {
        Self {
            plays_in_silent_mode: true,
            stays_active_in_background: true,
            duck_others: true,
        }
    }
}

/// Invoked by the engine on its own thread, periodically while a handle is loaded.
pub type StatusCallback = Box<dyn FnMut(Result<PlaybackStatus, PlaybackError>) + Send + 'static>;

/// Asynchronous playback capability.
///
/// Every call is a request: `Ok` means the engine accepted it, not that it happened.
/// The outcome is observed through the status callback registered at `load`.
pub trait PlaybackEngine: Send + Sync {
    fn set_audio_mode(&self, mode: AudioMode) -> Result<(), PlaybackError>;

    fn load(
        &self,
        uri: &str,
        options: LoadOptions,
        on_status: StatusCallback,
    ) -> Result<EngineHandle, PlaybackError>;

    fn play(&self, handle: EngineHandle) -> Result<(), PlaybackError>;

    fn pause(&self, handle: EngineHandle) -> Result<(), PlaybackError>;

    fn seek(&self, handle: EngineHandle, position_ms: u64) -> Result<(), PlaybackError>;

    /// Drops the source and its status callback. Never fails.
    fn release(&self, handle: EngineHandle);
}
