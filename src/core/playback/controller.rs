//! core/playback/controller.rs
//! Bridge between a player widget and a `PlaybackEngine`.
//!
//! - Owns at most one session (one source URI, one engine handle).
//! - User intents and engine reports all go through `session::reduce`.
//! - Engine reports arrive on the engine's thread; the callback only forwards them
//!   into a channel, tagged with the session id. `pump()` applies them on the UI thread.
//! - Engine failures are logged and never surface as errors.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

use tracing::{debug, info, trace, warn};

use super::session::{Command, Event, Phase, SessionState, Transition, reduce};
use super::{
    AudioMode, EngineHandle, LoadOptions, PlaybackEngine, PlaybackError, PlaybackStatus,
    StatusCallback, SurfaceState,
};

type SessionId = u64;

struct StatusEnvelope {
    session: SessionId,
    report: Result<PlaybackStatus, PlaybackError>,
}

/// Sees every raw engine status of the current session, loaded or not.
pub type StatusListener = Box<dyn FnMut(&PlaybackStatus) + Send + 'static>;

/// Releases its engine handle when dropped, on every exit path.
struct HandleGuard {
    engine: Arc<dyn PlaybackEngine>,
    handle: EngineHandle,
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        debug!(handle = self.handle.raw(), "releasing engine handle");
        self.engine.release(self.handle);
    }
}

struct Session {
    id: SessionId,
    state: SessionState,
    handle: Option<HandleGuard>,
}

pub struct PlaybackController {
    engine: Arc<dyn PlaybackEngine>,
    audio_mode: AudioMode,

    status_tx: Sender<StatusEnvelope>,
    status_rx: Receiver<StatusEnvelope>,

    next_session: SessionId,
    session: Option<Session>,

    listener: Option<StatusListener>,
}

impl PlaybackController {
    pub fn new(engine: Arc<dyn PlaybackEngine>, audio_mode: AudioMode) -> Self {
        let (status_tx, status_rx) = mpsc::channel();
        Self {
            engine,
            audio_mode,
            status_tx,
            status_rx,
            next_session: 1,
            session: None,
            listener: None,
        }
    }

    /// Called from `pump()` before each status is applied.
    pub fn set_status_listener(&mut self, listener: impl FnMut(&PlaybackStatus) + Send + 'static) {
        self.listener = Some(Box::new(listener));
    }

    /// Start a new session for `source_uri`, releasing the current one first.
    pub fn attach(&mut self, source_uri: impl Into<String>) {
        self.detach();

        let uri = source_uri.into();
        let id = self.next_session;
        self.next_session += 1;

        info!(session = id, uri = %uri, "attaching audio source");

        self.session = Some(Session {
            id,
            state: SessionState::default(),
            handle: None,
        });
        self.dispatch(Event::LoadRequested(uri));
    }

    /// Release the engine handle and stop listening for its status.
    pub fn detach(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        if session.state.phase == Phase::Released {
            return;
        }
        debug!(session = session.id, "detaching");
        self.dispatch(Event::Detached);

        // Reducer already asked for a release; make sure nothing outlives the session.
        if let Some(session) = self.session.as_mut() {
            session.handle = None;
        }
    }

    pub fn toggle_playback(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        let event = if session.state.is_playing {
            Event::PauseRequested
        } else {
            Event::PlayRequested
        };
        self.dispatch(event);
    }

    pub fn begin_scrub(&mut self) {
        self.dispatch(Event::ScrubBegan);
    }

    pub fn update_scrub(&mut self, fraction: f32) {
        self.dispatch(Event::ScrubMoved(fraction));
    }

    pub fn end_scrub(&mut self) {
        self.dispatch(Event::ScrubEnded);
    }

    /// Apply one engine status to the current session.
    pub fn on_status_update(&mut self, status: PlaybackStatus) {
        if let Some(session) = &self.session {
            trace!(
                session = session.id,
                loaded = status.loaded,
                position_ms = status.position_ms,
                duration_ms = status.duration_ms,
                is_playing = status.is_playing,
                "playback status"
            );
        }
        self.dispatch(Event::StatusReceived(status));
    }

    /// Drain reports forwarded by the engine. Reports from superseded sessions are dropped.
    /// Returns how many reports were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;

        while let Ok(envelope) = self.status_rx.try_recv() {
            let current = self.session.as_ref().map(|s| s.id);
            if current != Some(envelope.session) {
                trace!(session = envelope.session, "dropping stale status");
                continue;
            }

            match envelope.report {
                Ok(status) => {
                    if let Some(listener) = self.listener.as_mut() {
                        listener(&status);
                    }
                    self.on_status_update(status);
                }
                Err(err) => self.on_engine_error(err),
            }
            applied += 1;
        }

        applied
    }

    pub fn surface(&self) -> SurfaceState {
        self.session
            .as_ref()
            .map(|s| SurfaceState::from_session(&s.state))
            .unwrap_or_default()
    }

    pub fn phase(&self) -> Phase {
        self.session
            .as_ref()
            .map(|s| s.state.phase)
            .unwrap_or_default()
    }

    pub fn source_uri(&self) -> Option<&str> {
        self.session.as_ref()?.state.source_uri.as_deref()
    }

    fn on_engine_error(&mut self, err: PlaybackError) {
        match err {
            PlaybackError::LoadFailure { .. } | PlaybackError::UnsupportedUri(_) => {
                warn!(error = %err, "audio load failed");
                self.dispatch(Event::LoadFailed);
            }
            other => warn!(error = %other, "playback command failed"),
        }
    }

    fn dispatch(&mut self, event: Event) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let Transition { state, commands } = reduce(&session.state, event);
        session.state = state;

        for command in commands {
            self.execute(command);
        }
    }

    fn execute(&mut self, command: Command) {
        match command {
            Command::Load(uri) => self.load(&uri),
            Command::Release => {
                if let Some(session) = self.session.as_mut() {
                    session.handle = None;
                }
            }
            Command::Play => self.send("play", |engine, handle| engine.play(handle)),
            Command::Pause => self.send("pause", |engine, handle| engine.pause(handle)),
            Command::Seek(ms) => {
                debug!(position_ms = ms, "seeking");
                self.send("seek", |engine, handle| engine.seek(handle, ms));
            }
        }
    }

    fn load(&mut self, uri: &str) {
        let Some(id) = self.session.as_ref().map(|s| s.id) else {
            return;
        };

        if let Err(err) = self.engine.set_audio_mode(self.audio_mode) {
            warn!(error = %err, "could not apply audio mode");
        }

        let tx = self.status_tx.clone();
        let on_status: StatusCallback = Box::new(move |report| {
            // Receiver gone means the controller is gone; nothing left to update.
            let _ = tx.send(StatusEnvelope {
                session: id,
                report,
            });
        });

        let result = self
            .engine
            .load(uri, LoadOptions { autoplay: false }, on_status);

        match result {
            Ok(handle) => {
                let guard = HandleGuard {
                    engine: Arc::clone(&self.engine),
                    handle,
                };
                if let Some(session) = self.session.as_mut() {
                    session.handle = Some(guard);
                }
            }
            Err(err) => {
                warn!(uri = %uri, error = %err, "audio load failed");
                self.dispatch(Event::LoadFailed);
            }
        }
    }

    fn send(
        &self,
        name: &'static str,
        f: impl FnOnce(&dyn PlaybackEngine, EngineHandle) -> Result<(), PlaybackError>,
    ) {
        let Some(guard) = self.session.as_ref().and_then(|s| s.handle.as_ref()) else {
            debug!(command = name, "no engine handle attached");
            return;
        };
        if let Err(err) = f(self.engine.as_ref(), guard.handle) {
            warn!(command = name, error = %err, "playback command failed");
        }
    }
}
