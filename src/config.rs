//! App settings (JSON). Every field has a default, so a partial file is fine.
//!
//! Lookup: `$STORYNOOK_CONFIG`, else `./storynook.json`. No file means defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::playback::AudioMode;

pub(crate) const CONFIG_ENV: &str = "STORYNOOK_CONFIG";
pub(crate) const DEFAULT_CONFIG_FILE: &str = "storynook.json";

const DEFAULT_TICK_MS: u64 = 200;
const MIN_TICK_MS: u64 = 50;
const MAX_TICK_MS: u64 = 2000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read settings {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// JSON array of stories. Wins over `library_dir`.
    pub catalog_path: Option<PathBuf>,
    /// Folder of tagged MP3s.
    pub library_dir: Option<PathBuf>,
    /// Engine status interval.
    pub tick_ms: u64,
    pub audio_mode: AudioMode,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            catalog_path: None,
            library_dir: None,
            tick_ms: DEFAULT_TICK_MS,
            audio_mode: AudioMode::default(),
            log_filter: "storynook=info".to_string(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(&path)
    }

    /// Missing file -> defaults. Unreadable or malformed file -> error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.clamp(MIN_TICK_MS, MAX_TICK_MS))
    }
}
