//! core/playback/engine.rs
//! `PlaybackEngine` backed by rodio.
//!
//! Owns (on its own thread):
//! - OutputStream (must stay alive)
//! - one Sink per loaded handle
//! - command loop + periodic status ticks
//!
//! `RodioEngine` is the cheap, cloneable front end: it only sends commands.
//! `http(s)` sources are downloaded to a temp file on a fetch thread first.
//! No Iced imports.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::{
    AudioMode, EngineHandle, LoadOptions, PlaybackEngine, PlaybackError, PlaybackStatus,
    StatusCallback, probe,
};

enum EngineCommand {
    /// A download for `handle` started; its `Load` follows from the fetch thread.
    Fetching(EngineHandle),
    Load {
        handle: EngineHandle,
        uri: String,
        file: Result<AudioFile, String>,
        fetched: bool,
        autoplay: bool,
        on_status: StatusCallback,
    },
    Play(EngineHandle),
    Pause(EngineHandle),
    Seek(EngineHandle, u64),
    Release(EngineHandle),
    SetAudioMode(AudioMode),
}

#[derive(Clone)]
pub struct RodioEngine {
    command_tx: Sender<EngineCommand>,
    next_handle: Arc<AtomicU64>,
}

impl RodioEngine {
    /// Spawns the engine thread. Status is reported every `tick`.
    ///
    /// The thread exits once every `RodioEngine` clone is dropped.
    pub fn start(tick: Duration) -> Result<Self, PlaybackError> {
        let (command_tx, command_rx) = mpsc::channel::<EngineCommand>();

        thread::Builder::new()
            .name("storynook-playback".into())
            .spawn(move || {
                let mut worker = EngineWorker::new(tick);
                worker.run(command_rx);
            })
            .map_err(|e| {
                warn!(error = %e, "could not spawn playback thread");
                PlaybackError::EngineUnavailable
            })?;

        Ok(Self {
            command_tx,
            next_handle: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Downloads off the engine thread so ticks for other voices keep flowing.
    fn spawn_fetch(
        &self,
        handle: EngineHandle,
        url: String,
        options: LoadOptions,
        on_status: StatusCallback,
    ) -> Result<(), PlaybackError> {
        let command_tx = self.command_tx.clone();

        thread::Builder::new()
            .name("storynook-fetch".into())
            .spawn(move || {
                info!(handle = handle.raw(), url = %url, "downloading story audio");
                let file = download(&url);
                let _ = command_tx.send(EngineCommand::Load {
                    handle,
                    uri: url,
                    file,
                    fetched: true,
                    autoplay: options.autoplay,
                    on_status,
                });
            })
            .map(|_| ())
            .map_err(|e| {
                warn!(error = %e, "could not spawn fetch thread");
                PlaybackError::EngineUnavailable
            })
    }

    /// Best-effort send. If the engine died, the command is dropped.
    fn send(&self, cmd: EngineCommand) -> Result<(), PlaybackError> {
        self.command_tx
            .send(cmd)
            .map_err(|_| PlaybackError::EngineUnavailable)
    }
}

impl PlaybackEngine for RodioEngine {
    fn set_audio_mode(&self, mode: AudioMode) -> Result<(), PlaybackError> {
        self.send(EngineCommand::SetAudioMode(mode))
    }

    fn load(
        &self,
        uri: &str,
        options: LoadOptions,
        on_status: StatusCallback,
    ) -> Result<EngineHandle, PlaybackError> {
        let source = audio_source(uri)?;
        let handle = EngineHandle::from_raw(self.next_handle.fetch_add(1, Ordering::Relaxed));

        match source {
            AudioSource::Local(path) => self.send(EngineCommand::Load {
                handle,
                uri: uri.to_string(),
                file: Ok(AudioFile::local(path)),
                fetched: false,
                autoplay: options.autoplay,
                on_status,
            })?,
            AudioSource::Remote(url) => {
                self.send(EngineCommand::Fetching(handle))?;
                self.spawn_fetch(handle, url, options, on_status)?;
            }
        }

        Ok(handle)
    }

    fn play(&self, handle: EngineHandle) -> Result<(), PlaybackError> {
        self.send(EngineCommand::Play(handle))
    }

    fn pause(&self, handle: EngineHandle) -> Result<(), PlaybackError> {
        self.send(EngineCommand::Pause(handle))
    }

    fn seek(&self, handle: EngineHandle, position_ms: u64) -> Result<(), PlaybackError> {
        self.send(EngineCommand::Seek(handle, position_ms))
    }

    fn release(&self, handle: EngineHandle) {
        let _ = self.send(EngineCommand::Release(handle));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AudioSource {
    Local(PathBuf),
    Remote(String),
}

/// Plain paths and `file://` URIs are local; `http(s)` URLs are downloaded.
pub(crate) fn audio_source(uri: &str) -> Result<AudioSource, PlaybackError> {
    if uri.trim().is_empty() {
        return Err(PlaybackError::UnsupportedUri(uri.to_string()));
    }
    if let Some(rest) = uri.strip_prefix("file://") {
        return Ok(AudioSource::Local(PathBuf::from(rest)));
    }
    if uri.starts_with("http://") || uri.starts_with("https://") {
        return Ok(AudioSource::Remote(uri.to_string()));
    }
    if uri.contains("://") {
        return Err(PlaybackError::UnsupportedUri(uri.to_string()));
    }
    Ok(AudioSource::Local(PathBuf::from(uri)))
}

/// Decodable file on disk. A downloaded one is deleted with its voice.
struct AudioFile {
    path: PathBuf,
    _download: Option<NamedTempFile>,
}

impl AudioFile {
    fn local(path: PathBuf) -> Self {
        Self {
            path,
            _download: None,
        }
    }
}

fn download(url: &str) -> Result<AudioFile, String> {
    let response = ureq::get(url)
        .call()
        .map_err(|e| format!("Download failed: {e}"))?;

    // Keep the extension so the probe gets a format hint.
    let suffix = file_suffix(url);
    let mut file = tempfile::Builder::new()
        .prefix("storynook-")
        .suffix(&suffix)
        .tempfile()
        .map_err(|e| format!("Temp file failed: {e}"))?;

    let mut body = response.into_body().into_reader();
    let bytes = io::copy(&mut body, &mut file).map_err(|e| format!("Download failed: {e}"))?;
    debug!(url, bytes, path = %file.path().display(), "download finished");

    Ok(AudioFile {
        path: file.path().to_path_buf(),
        _download: Some(file),
    })
}

/// ".mp3" for ".../song.mp3?x=1"; empty when the URL path has no extension.
fn file_suffix(url: &str) -> String {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let Some(slash) = rest.find('/') else {
        return String::new();
    };
    let path = rest[slash..].split(['?', '#']).next().unwrap_or_default();
    let name = path.rsplit('/').next().unwrap_or_default();

    match name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && (1..=5).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            format!(".{ext}")
        }
        _ => String::new(),
    }
}

/// Sink position as reported: pinned to the end once the source ran out, never past it.
fn reported_position(pos_ms: u64, duration_ms: u64, finished: bool) -> u64 {
    let mut position_ms = pos_ms;
    if finished {
        position_ms = duration_ms.max(position_ms);
    }
    if duration_ms > 0 {
        position_ms = position_ms.min(duration_ms);
    }
    position_ms
}

/// Seeking to *exactly* the end tends to produce EOF weirdness; clamp slightly.
fn seek_target(ms: u64, duration_ms: u64) -> u64 {
    if duration_ms > 0 && ms >= duration_ms {
        duration_ms - 1
    } else {
        ms
    }
}

struct Voice {
    file: AudioFile,
    sink: Sink,
    duration_ms: u64,
    /// Source ran out; the sink is empty and paused.
    finished: bool,
    on_status: StatusCallback,
}

impl Voice {
    fn status(&self) -> PlaybackStatus {
        let pos_ms = self.sink.get_pos().as_millis() as u64;

        PlaybackStatus {
            loaded: true,
            position_ms: reported_position(pos_ms, self.duration_ms, self.finished),
            duration_ms: self.duration_ms,
            is_playing: !self.finished && !self.sink.is_paused(),
        }
    }

    fn report(&mut self) {
        let status = self.status();
        (self.on_status)(Ok(status));
    }

    fn fail(&mut self, command: &'static str, reason: String) {
        warn!(command, reason = %reason, "playback command failed");
        (self.on_status)(Err(PlaybackError::CommandFailure { command, reason }));
    }

    /// Re-append the source after it ran out, so play/seek work again.
    fn refill(&mut self) -> Result<(), String> {
        if !self.finished {
            return Ok(());
        }
        let source = open_decoder(&self.file.path)?;
        self.sink.append(source);
        self.finished = false;
        Ok(())
    }

    /// Marks the voice finished once its sink ran dry. True only on that transition.
    fn check_finished(&mut self) -> bool {
        if self.finished || !self.sink.empty() {
            return false;
        }
        self.finished = true;
        self.sink.pause();
        true
    }
}

struct EngineWorker {
    // Keep this alive for the lifetime of the engine!
    stream: Option<OutputStream>,
    voices: HashMap<EngineHandle, Voice>,
    /// Handles whose download is still running.
    fetching: HashSet<EngineHandle>,
    audio_mode: AudioMode,
    tick: Duration,
}

impl EngineWorker {
    fn new(tick: Duration) -> Self {
        // rodio 0.21.x: build/open the default output stream via OutputStreamBuilder
        let stream = match OutputStreamBuilder::open_default_stream() {
            Ok(stream) => Some(stream),
            Err(e) => {
                warn!(error = %e, "no audio output device; every load will fail");
                None
            }
        };

        Self {
            stream,
            voices: HashMap::new(),
            fetching: HashSet::new(),
            audio_mode: AudioMode::default(),
            tick,
        }
    }

    fn run(&mut self, command_rx: Receiver<EngineCommand>) {
        loop {
            match command_rx.recv_timeout(self.tick) {
                Ok(cmd) => {
                    self.handle_command(cmd);
                    while let Ok(cmd) = command_rx.try_recv() {
                        self.handle_command(cmd);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            self.tick();
        }

        debug!(voices = self.voices.len(), "playback engine shutting down");
        for (_, voice) in self.voices.drain() {
            voice.sink.stop();
        }
    }

    fn handle_command(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::Fetching(handle) => {
                self.fetching.insert(handle);
            }
            EngineCommand::Load {
                handle,
                uri,
                file,
                fetched,
                autoplay,
                on_status,
            } => {
                if fetched && !self.fetching.remove(&handle) {
                    debug!(handle = handle.raw(), "released before download finished");
                    return;
                }
                self.load(handle, uri, file, autoplay, on_status);
            }
            EngineCommand::Play(handle) => {
                let Some(voice) = self.voices.get_mut(&handle) else {
                    debug!(handle = handle.raw(), "play for unknown handle");
                    return;
                };
                if let Err(reason) = voice.refill() {
                    voice.fail("play", reason);
                    return;
                }
                voice.sink.play();
                voice.report();
            }
            EngineCommand::Pause(handle) => {
                let Some(voice) = self.voices.get_mut(&handle) else {
                    debug!(handle = handle.raw(), "pause for unknown handle");
                    return;
                };
                voice.sink.pause();
                voice.report();
            }
            EngineCommand::Seek(handle, ms) => {
                let Some(voice) = self.voices.get_mut(&handle) else {
                    debug!(handle = handle.raw(), "seek for unknown handle");
                    return;
                };
                if let Err(reason) = voice.refill() {
                    voice.fail("seek", reason);
                    return;
                }

                let target_ms = seek_target(ms, voice.duration_ms);
                match voice.sink.try_seek(Duration::from_millis(target_ms)) {
                    Ok(()) => voice.report(),
                    Err(e) => voice.fail("seek", e.to_string()),
                }
            }
            EngineCommand::Release(handle) => {
                if self.fetching.remove(&handle) {
                    debug!(handle = handle.raw(), "download abandoned");
                } else if let Some(voice) = self.voices.remove(&handle) {
                    debug!(
                        handle = handle.raw(),
                        path = %voice.file.path.display(),
                        "voice released"
                    );
                    voice.sink.stop();
                }
            }
            EngineCommand::SetAudioMode(mode) => {
                if mode != self.audio_mode {
                    // Desktop output has no platform audio session; the mode is recorded only.
                    info!(
                        silent_mode = mode.plays_in_silent_mode,
                        background = mode.stays_active_in_background,
                        duck = mode.duck_others,
                        "audio mode set"
                    );
                    self.audio_mode = mode;
                }
            }
        }
    }

    fn load(
        &mut self,
        handle: EngineHandle,
        uri: String,
        file: Result<AudioFile, String>,
        autoplay: bool,
        mut on_status: StatusCallback,
    ) {
        let opened = file.and_then(|file| {
            let (sink, duration_ms) = self.open_sink(&file.path, autoplay)?;
            Ok((file, sink, duration_ms))
        });

        let (file, sink, duration_ms) = match opened {
            Ok(v) => v,
            Err(reason) => {
                warn!(uri = %uri, reason = %reason, "load failed");
                on_status(Err(PlaybackError::LoadFailure { uri, reason }));
                return;
            }
        };

        info!(handle = handle.raw(), uri = %uri, duration_ms, "voice loaded");

        let mut voice = Voice {
            file,
            sink,
            duration_ms,
            finished: false,
            on_status,
        };
        voice.report();
        self.voices.insert(handle, voice);
    }

    fn open_sink(&self, path: &Path, autoplay: bool) -> Result<(Sink, u64), String> {
        let stream = self
            .stream
            .as_ref()
            .ok_or_else(|| "no audio output device".to_string())?;

        let source = open_decoder(path)?;
        let duration_ms = probe::duration_ms(path)
            .or_else(|| source.total_duration().map(|d| d.as_millis() as u64))
            .unwrap_or(0);

        // rodio 0.21.x: Sink is created from the stream's mixer
        let sink = Sink::connect_new(stream.mixer());
        if !autoplay {
            sink.pause();
        }
        sink.append(source);

        Ok((sink, duration_ms))
    }

    fn tick(&mut self) {
        for voice in self.voices.values_mut() {
            if voice.check_finished() {
                debug!(path = %voice.file.path.display(), "voice reached end");
            }
            voice.report();
        }
    }
}

fn open_decoder(path: &Path) -> Result<Decoder<BufReader<File>>, String> {
    let file = File::open(path).map_err(|e| format!("Failed to open file: {e}"))?;
    Decoder::new(BufReader::new(file)).map_err(|e| format!("Decode failed: {e}"))
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::Mutex;

    use rodio::source::SineWave;

    use super::*;

    #[test]
    fn plain_paths_and_file_uris_are_local() {
        assert_eq!(
            audio_source("stories/a.mp3").expect("plain path"),
            AudioSource::Local(PathBuf::from("stories/a.mp3"))
        );
        assert_eq!(
            audio_source("file:///tmp/a.mp3").expect("file uri"),
            AudioSource::Local(PathBuf::from("/tmp/a.mp3"))
        );
    }

    #[test]
    fn http_urls_are_downloaded_other_schemes_rejected() {
        let url = "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-1.mp3";
        assert_eq!(
            audio_source(url).expect("https"),
            AudioSource::Remote(url.into())
        );
        assert!(matches!(
            audio_source("http://localhost/a.mp3"),
            Ok(AudioSource::Remote(_))
        ));
        assert_eq!(
            audio_source("ftp://example.com/a.mp3"),
            Err(PlaybackError::UnsupportedUri("ftp://example.com/a.mp3".into()))
        );
        assert!(audio_source("  ").is_err());
    }

    #[test]
    fn suffix_comes_from_the_url_path() {
        assert_eq!(file_suffix("https://x.org/mp3/Song-1.mp3"), ".mp3");
        assert_eq!(file_suffix("https://x.org/a.ogg?sig=1#t"), ".ogg");
        assert_eq!(file_suffix("https://x.org"), "");
        assert_eq!(file_suffix("https://x.org/stream"), "");
        assert_eq!(file_suffix("https://x.org/.hidden"), "");
    }

    /// Serves one canned HTTP response on a local port and returns its base URL.
    fn serve_once(status: &'static str, body: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");

        thread::spawn(move || {
            let (mut conn, _) = listener.accept().expect("accept");
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = conn.read(&mut buf).expect("read request");
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let head = format!(
                "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            conn.write_all(head.as_bytes()).expect("write head");
            conn.write_all(body).expect("write body");
        });

        format!("http://{addr}")
    }

    #[test]
    fn download_writes_body_to_temp_file_with_extension() {
        let base = serve_once("200 OK", b"not really audio");
        let file = download(&format!("{base}/stories/owls.mp3")).expect("download");

        assert_eq!(
            file.path.extension().and_then(|e| e.to_str()),
            Some("mp3")
        );
        assert_eq!(
            std::fs::read(&file.path).expect("read download"),
            b"not really audio"
        );

        let path = file.path.clone();
        drop(file);
        assert!(!path.exists());
    }

    #[test]
    fn download_reports_http_errors() {
        let base = serve_once("404 Not Found", b"");
        let err = download(&format!("{base}/missing.mp3")).err().expect("404 fails");
        assert!(err.starts_with("Download failed"), "{err}");
    }

    #[test]
    fn position_is_pinned_to_the_end_once_finished() {
        assert_eq!(reported_position(1200, 5000, false), 1200);
        assert_eq!(reported_position(4990, 5000, true), 5000);
        assert_eq!(reported_position(7000, 5000, false), 5000);
        // Unknown duration: report the sink as is.
        assert_eq!(reported_position(1200, 0, false), 1200);
        assert_eq!(reported_position(1200, 0, true), 1200);
    }

    #[test]
    fn seek_at_or_past_the_end_is_clamped() {
        assert_eq!(seek_target(2500, 5000), 2500);
        assert_eq!(seek_target(5000, 5000), 4999);
        assert_eq!(seek_target(9000, 5000), 4999);
        assert_eq!(seek_target(9000, 0), 9000);
    }

    /// 16-bit mono PCM WAV, `ms` long at 8 kHz.
    fn wav_bytes(ms: u32) -> Vec<u8> {
        let rate = 8000u32;
        let data_len = rate / 1000 * ms * 2;
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVEfmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&1u16.to_le_bytes()); // mono
        out.extend_from_slice(&rate.to_le_bytes());
        out.extend_from_slice(&(rate * 2).to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        out.resize(out.len() + data_len as usize, 0);
        out
    }

    type Reports = Arc<Mutex<Vec<Result<PlaybackStatus, PlaybackError>>>>;

    fn voice(path: PathBuf, sink: Sink, duration_ms: u64) -> (Voice, Reports) {
        let reports: Reports = Arc::default();
        let log = Arc::clone(&reports);
        let voice = Voice {
            file: AudioFile::local(path),
            sink,
            duration_ms,
            finished: false,
            on_status: Box::new(move |r| log.lock().expect("reports").push(r)),
        };
        (voice, reports)
    }

    #[test]
    fn voice_finishes_when_sink_runs_dry() {
        let (sink, mut output) = Sink::new();
        sink.append(SineWave::new(440.0).take_duration(Duration::from_millis(20)));
        let (mut voice, reports) = voice(PathBuf::from("tone.wav"), sink, 20);

        assert!(!voice.check_finished());
        assert!(voice.status().is_playing);

        // Pull the tone through the queue; the queue pads with silence afterwards.
        for _ in 0..48_000 {
            if output.next().is_none() {
                break;
            }
        }

        assert!(voice.check_finished());
        assert!(!voice.check_finished());
        assert!(voice.sink.is_paused());

        voice.report();
        assert_eq!(
            reports.lock().expect("reports").last(),
            Some(&Ok(PlaybackStatus {
                loaded: true,
                position_ms: 20,
                duration_ms: 20,
                is_playing: false,
            }))
        );
    }

    #[test]
    fn refill_reopens_a_finished_source() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tone.wav");
        std::fs::write(&path, wav_bytes(50)).expect("write wav");
        assert_eq!(probe::duration_ms(&path), Some(50));

        let (sink, _output) = Sink::new();
        let (mut voice, _) = voice(path, sink, 50);

        // Not finished: nothing to re-append.
        voice.refill().expect("noop refill");
        assert!(voice.sink.empty());

        voice.finished = true;
        voice.refill().expect("refill");
        assert!(!voice.finished);
        assert_eq!(voice.sink.len(), 1);
    }

    #[test]
    fn refill_of_a_vanished_file_fails() {
        let (sink, _output) = Sink::new();
        let (mut voice, _) = voice(PathBuf::from("/nonexistent/tone.wav"), sink, 50);
        voice.finished = true;

        let err = voice.refill().err().expect("missing file");
        assert!(err.starts_with("Failed to open file"), "{err}");
        assert!(voice.finished);
    }
}
