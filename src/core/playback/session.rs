//! core/playback/session.rs
//! Session state machine.
//!
//! `reduce` is the only place session fields change:
//! - engine-sourced fields (position, duration, playing) are written from `StatusReceived` only
//! - user intents never flip `is_playing`; they produce engine commands and wait for status
//! - scrubbing moves the position locally and seeks once, when the gesture ends
//!
//! Idle -> Loading -> Ready -> Released (terminal). Loading -> Released on failure/detach.

use super::PlaybackStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    /// Load requested, engine has not reported a loaded status yet.
    Loading,
    /// Engine reported loaded. Paused/playing is `is_playing`.
    Ready,
    Released,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    pub phase: Phase,
    pub source_uri: Option<String>,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub is_playing: bool,
    pub is_scrubbing: bool,
    /// Last scrub position of the current gesture; committed on `ScrubEnded`.
    pub scrub_target_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    LoadRequested(String),
    StatusReceived(PlaybackStatus),
    LoadFailed,
    PlayRequested,
    PauseRequested,
    ScrubBegan,
    /// Pointer position normalized against the seek control width.
    ScrubMoved(f32),
    ScrubEnded,
    Detached,
}

/// What the controller must ask the engine to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Load(String),
    Play,
    Pause,
    Seek(u64),
    Release,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: SessionState,
    pub commands: Vec<Command>,
}

impl Transition {
    fn unchanged(state: &SessionState) -> Self {
        Self {
            state: state.clone(),
            commands: Vec::new(),
        }
    }
}

pub fn reduce(state: &SessionState, event: Event) -> Transition {
    match event {
        Event::LoadRequested(uri) => {
            // The source is immutable for the session's life.
            if state.phase != Phase::Idle {
                return Transition::unchanged(state);
            }
            Transition {
                state: SessionState {
                    phase: Phase::Loading,
                    source_uri: Some(uri.clone()),
                    ..SessionState::default()
                },
                commands: vec![Command::Load(uri)],
            }
        }

        Event::StatusReceived(status) => {
            let live = matches!(state.phase, Phase::Loading | Phase::Ready);
            if !live || !status.loaded {
                return Transition::unchanged(state);
            }

            let mut next = state.clone();
            next.phase = Phase::Ready;
            next.duration_ms = status.duration_ms;
            next.is_playing = status.is_playing;

            if !next.is_scrubbing {
                next.position_ms = status.position_ms;
            }
            next.position_ms = clamp_to_duration(next.position_ms, next.duration_ms);
            next.scrub_target_ms = next
                .scrub_target_ms
                .map(|ms| clamp_to_duration(ms, next.duration_ms));

            Transition {
                state: next,
                commands: Vec::new(),
            }
        }

        Event::LoadFailed => {
            if state.phase != Phase::Loading {
                return Transition::unchanged(state);
            }
            Transition {
                state: SessionState {
                    phase: Phase::Released,
                    source_uri: state.source_uri.clone(),
                    ..SessionState::default()
                },
                commands: vec![Command::Release],
            }
        }

        Event::PlayRequested => {
            if state.phase != Phase::Ready || state.is_playing {
                return Transition::unchanged(state);
            }
            Transition {
                state: state.clone(),
                commands: vec![Command::Play],
            }
        }

        Event::PauseRequested => {
            if state.phase != Phase::Ready || !state.is_playing {
                return Transition::unchanged(state);
            }
            Transition {
                state: state.clone(),
                commands: vec![Command::Pause],
            }
        }

        Event::ScrubBegan => {
            if state.phase != Phase::Ready {
                return Transition::unchanged(state);
            }
            let mut next = state.clone();
            next.is_scrubbing = true;
            next.scrub_target_ms = None;
            Transition {
                state: next,
                commands: Vec::new(),
            }
        }

        Event::ScrubMoved(fraction) => {
            if state.phase != Phase::Ready || !state.is_scrubbing || state.duration_ms == 0 {
                return Transition::unchanged(state);
            }
            let target = position_for_fraction(state.duration_ms, fraction);
            let mut next = state.clone();
            next.position_ms = target;
            next.scrub_target_ms = Some(target);
            Transition {
                state: next,
                commands: Vec::new(),
            }
        }

        Event::ScrubEnded => {
            if !state.is_scrubbing {
                return Transition::unchanged(state);
            }
            let mut next = state.clone();
            next.is_scrubbing = false;
            let commands = match next.scrub_target_ms.take() {
                Some(ms) if next.phase == Phase::Ready => vec![Command::Seek(ms)],
                _ => Vec::new(),
            };
            Transition {
                state: next,
                commands,
            }
        }

        Event::Detached => {
            let commands = match state.phase {
                Phase::Loading | Phase::Ready => vec![Command::Release],
                Phase::Idle | Phase::Released => Vec::new(),
            };
            Transition {
                state: SessionState {
                    phase: Phase::Released,
                    source_uri: state.source_uri.clone(),
                    ..SessionState::default()
                },
                commands,
            }
        }
    }
}

/// `clamp(duration * fraction, 0, duration)`; non-finite fractions map to 0.
pub(crate) fn position_for_fraction(duration_ms: u64, fraction: f32) -> u64 {
    let fraction = if fraction.is_finite() {
        f64::from(fraction.clamp(0.0, 1.0))
    } else {
        0.0
    };
    let ms = (duration_ms as f64 * fraction).round() as u64;
    ms.min(duration_ms)
}

fn clamp_to_duration(position_ms: u64, duration_ms: u64) -> u64 {
    if duration_ms == 0 {
        position_ms
    } else {
        position_ms.min(duration_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(position_ms: u64, duration_ms: u64, is_playing: bool) -> PlaybackStatus {
        PlaybackStatus {
            loaded: true,
            position_ms,
            duration_ms,
            is_playing,
        }
    }

    fn ready(duration_ms: u64, is_playing: bool) -> SessionState {
        let s = reduce(&SessionState::default(), Event::LoadRequested("a.mp3".into())).state;
        reduce(
            &s,
            Event::StatusReceived(loaded(0, duration_ms, is_playing)),
        )
        .state
    }

    #[test]
    fn load_requested_moves_idle_to_loading() {
        let t = reduce(&SessionState::default(), Event::LoadRequested("a.mp3".into()));
        assert_eq!(t.state.phase, Phase::Loading);
        assert_eq!(t.state.source_uri.as_deref(), Some("a.mp3"));
        assert_eq!(t.commands, vec![Command::Load("a.mp3".into())]);
    }

    #[test]
    fn source_is_immutable_once_set() {
        let s = ready(5000, false);
        let t = reduce(&s, Event::LoadRequested("b.mp3".into()));
        assert_eq!(t.state, s);
        assert!(t.commands.is_empty());
    }

    #[test]
    fn unloaded_status_is_ignored() {
        let s = reduce(&SessionState::default(), Event::LoadRequested("a.mp3".into())).state;
        let t = reduce(
            &s,
            Event::StatusReceived(PlaybackStatus {
                loaded: false,
                position_ms: 10,
                duration_ms: 100,
                is_playing: true,
            }),
        );
        assert_eq!(t.state, s);
    }

    #[test]
    fn first_loaded_status_makes_session_ready() {
        let s = ready(5000, false);
        assert_eq!(s.phase, Phase::Ready);
        assert_eq!(s.duration_ms, 5000);
        assert!(!s.is_playing);
    }

    #[test]
    fn status_position_is_clamped_to_duration() {
        let s = ready(5000, true);
        let t = reduce(&s, Event::StatusReceived(loaded(7000, 5000, true)));
        assert_eq!(t.state.position_ms, 5000);
    }

    #[test]
    fn play_and_pause_are_not_optimistic() {
        let s = ready(5000, false);

        let t = reduce(&s, Event::PlayRequested);
        assert_eq!(t.commands, vec![Command::Play]);
        assert!(!t.state.is_playing);

        let playing = reduce(&s, Event::StatusReceived(loaded(0, 5000, true))).state;
        let t = reduce(&playing, Event::PauseRequested);
        assert_eq!(t.commands, vec![Command::Pause]);
        assert!(t.state.is_playing);
    }

    #[test]
    fn play_is_noop_while_loading() {
        let s = reduce(&SessionState::default(), Event::LoadRequested("a.mp3".into())).state;
        assert!(reduce(&s, Event::PlayRequested).commands.is_empty());
    }

    #[test]
    fn scrub_updates_locally_and_seeks_once_on_end() {
        let s = ready(5000, false);
        let s = reduce(&s, Event::ScrubBegan).state;

        let t = reduce(&s, Event::ScrubMoved(0.2));
        assert!(t.commands.is_empty());
        let t = reduce(&t.state, Event::ScrubMoved(0.5));
        assert!(t.commands.is_empty());
        assert_eq!(t.state.position_ms, 2500);

        let t = reduce(&t.state, Event::ScrubEnded);
        assert!(!t.state.is_scrubbing);
        assert_eq!(t.commands, vec![Command::Seek(2500)]);
    }

    #[test]
    fn engine_position_does_not_override_scrub() {
        let s = ready(5000, true);
        let s = reduce(&s, Event::ScrubBegan).state;
        let s = reduce(&s, Event::ScrubMoved(0.8)).state;

        let t = reduce(&s, Event::StatusReceived(loaded(100, 5000, true)));
        assert_eq!(t.state.position_ms, 4000);
        assert!(t.state.is_playing);
    }

    #[test]
    fn scrub_without_move_does_not_seek() {
        let s = ready(5000, false);
        let s = reduce(&s, Event::ScrubBegan).state;
        let t = reduce(&s, Event::ScrubEnded);
        assert!(t.commands.is_empty());
    }

    #[test]
    fn scrub_is_ignored_until_duration_known() {
        let s = ready(0, false);
        let s = reduce(&s, Event::ScrubBegan).state;
        let t = reduce(&s, Event::ScrubMoved(0.5));
        assert_eq!(t.state.position_ms, 0);
        assert_eq!(t.state.scrub_target_ms, None);
    }

    #[test]
    fn scrub_fraction_is_clamped() {
        assert_eq!(position_for_fraction(5000, 1.7), 5000);
        assert_eq!(position_for_fraction(5000, -0.3), 0);
        assert_eq!(position_for_fraction(5000, f32::NAN), 0);
    }

    #[test]
    fn load_failure_releases_and_resets() {
        let s = reduce(&SessionState::default(), Event::LoadRequested("a.mp3".into())).state;
        let t = reduce(&s, Event::LoadFailed);
        assert_eq!(t.state.phase, Phase::Released);
        assert_eq!(t.state.duration_ms, 0);
        assert_eq!(t.commands, vec![Command::Release]);
    }

    #[test]
    fn released_session_ignores_status() {
        let s = ready(5000, true);
        let t = reduce(&s, Event::Detached);
        assert_eq!(t.commands, vec![Command::Release]);

        let after = reduce(&t.state, Event::StatusReceived(loaded(1000, 5000, true)));
        assert_eq!(after.state, t.state);
        assert!(!after.state.is_playing);
    }

    #[test]
    fn detaching_idle_session_releases_nothing() {
        let t = reduce(&SessionState::default(), Event::Detached);
        assert_eq!(t.state.phase, Phase::Released);
        assert!(t.commands.is_empty());
    }
}
