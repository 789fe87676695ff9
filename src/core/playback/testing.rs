//! Recording engine for controller tests.

use std::collections::HashMap;
use std::sync::Mutex;

use super::{
    AudioMode, EngineHandle, LoadOptions, PlaybackEngine, PlaybackError, PlaybackStatus,
    StatusCallback,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    AudioMode(AudioMode),
    Load {
        handle: EngineHandle,
        uri: String,
        autoplay: bool,
    },
    Play(EngineHandle),
    Pause(EngineHandle),
    Seek(EngineHandle, u64),
    Release(EngineHandle),
}

#[derive(Default)]
struct Inner {
    next_handle: u64,
    calls: Vec<Call>,
    callbacks: HashMap<EngineHandle, StatusCallback>,
    fail_load: bool,
    fail_commands: bool,
}

#[derive(Default)]
pub(crate) struct FakeEngine {
    inner: Mutex<Inner>,
}

impl FakeEngine {
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("fake engine poisoned")
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub(crate) fn seeks(&self) -> Vec<u64> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Seek(_, ms) => Some(*ms),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn live_handles(&self) -> Vec<EngineHandle> {
        self.lock().callbacks.keys().copied().collect()
    }

    pub(crate) fn last_handle(&self) -> Option<EngineHandle> {
        self.lock().calls.iter().rev().find_map(|c| match c {
            Call::Load { handle, .. } => Some(*handle),
            _ => None,
        })
    }

    pub(crate) fn fail_loads(&self, fail: bool) {
        self.lock().fail_load = fail;
    }

    pub(crate) fn fail_commands(&self, fail: bool) {
        self.lock().fail_commands = fail;
    }

    /// Delivers a report through `handle`'s callback. False if the handle was released.
    pub(crate) fn emit(
        &self,
        handle: EngineHandle,
        report: Result<PlaybackStatus, PlaybackError>,
    ) -> bool {
        let mut inner = self.lock();
        match inner.callbacks.get_mut(&handle) {
            Some(cb) => {
                cb(report);
                true
            }
            None => false,
        }
    }

    pub(crate) fn emit_status(&self, handle: EngineHandle, status: PlaybackStatus) -> bool {
        self.emit(handle, Ok(status))
    }

    fn command(&self, call: Call, name: &'static str) -> Result<(), PlaybackError> {
        let mut inner = self.lock();
        inner.calls.push(call);
        if inner.fail_commands {
            return Err(PlaybackError::CommandFailure {
                command: name,
                reason: "rejected".into(),
            });
        }
        Ok(())
    }
}

impl PlaybackEngine for FakeEngine {
    fn set_audio_mode(&self, mode: AudioMode) -> Result<(), PlaybackError> {
        self.lock().calls.push(Call::AudioMode(mode));
        Ok(())
    }

    fn load(
        &self,
        uri: &str,
        options: LoadOptions,
        on_status: StatusCallback,
    ) -> Result<EngineHandle, PlaybackError> {
        let mut inner = self.lock();
        if inner.fail_load {
            return Err(PlaybackError::LoadFailure {
                uri: uri.to_string(),
                reason: "fake load failure".into(),
            });
        }
        inner.next_handle += 1;
        let handle = EngineHandle::from_raw(inner.next_handle);
        inner.calls.push(Call::Load {
            handle,
            uri: uri.to_string(),
            autoplay: options.autoplay,
        });
        inner.callbacks.insert(handle, on_status);
        Ok(handle)
    }

    fn play(&self, handle: EngineHandle) -> Result<(), PlaybackError> {
        self.command(Call::Play(handle), "play")
    }

    fn pause(&self, handle: EngineHandle) -> Result<(), PlaybackError> {
        self.command(Call::Pause(handle), "pause")
    }

    fn seek(&self, handle: EngineHandle, position_ms: u64) -> Result<(), PlaybackError> {
        self.command(Call::Seek(handle, position_ms), "seek")
    }

    fn release(&self, handle: EngineHandle) {
        let mut inner = self.lock();
        inner.calls.push(Call::Release(handle));
        inner.callbacks.remove(&handle);
    }
}
