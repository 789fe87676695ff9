//! core/catalog.rs
//! Where the story list comes from:
//! - a JSON file (array of `Story`)
//! - a folder of MP3s, metadata from ID3 tags
//! - the built-in list
//!
//! Tag reading never fails a scan: an untagged file still becomes a story.

use std::path::{Path, PathBuf};

use id3::{Tag, TagLike};
use thiserror::Error;
use tracing::{debug, info};

use super::types::Story;
use crate::config::Settings;

/// User text frame (TXXX) carrying the age range, e.g. "5-8".
const AGE_RANGE_FRAME: &str = "AGE_RANGE";

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid story catalog {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Not a folder: {0}")]
    NotADirectory(PathBuf),
}

pub fn builtin() -> Vec<Story> {
    vec![
        Story {
            id: "1".into(),
            title: "The Magic Forest".into(),
            description: "A wonderful adventure awaits in the enchanted forest...".into(),
            duration_label: "5 min".into(),
            age_range: "5-8".into(),
            image_uri: "https://cdn.midjourney.com/55ace2e0-d376-4634-a888-2834ffb7a250/0_0.jpeg"
                .into(),
            audio_uri: "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-1.mp3".into(),
        },
        Story {
            id: "2".into(),
            title: "Space Adventures".into(),
            description: "Join Captain Star on an intergalactic journey...".into(),
            duration_label: "8 min".into(),
            age_range: "7-10".into(),
            image_uri: "https://cdn.midjourney.com/e05f5fd9-dbad-49eb-9586-803a5b4ecc04/0_1.jpeg"
                .into(),
            audio_uri: "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-2.mp3".into(),
        },
    ]
}

/// JSON catalog if configured, else library folder if configured, else built-in.
pub fn load(settings: &Settings) -> Result<Vec<Story>, CatalogError> {
    if let Some(path) = &settings.catalog_path {
        let stories = load_json(path)?;
        info!(path = %path.display(), count = stories.len(), "loaded story catalog");
        return Ok(stories);
    }

    if let Some(dir) = &settings.library_dir {
        let stories = scan_dir(dir)?;
        info!(dir = %dir.display(), count = stories.len(), "scanned story folder");
        return Ok(stories);
    }

    Ok(builtin())
}

pub fn load_json(path: &Path) -> Result<Vec<Story>, CatalogError> {
    let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CatalogError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// One story per `.mp3` under `root`, sorted by path.
pub fn scan_dir(root: &Path) -> Result<Vec<Story>, CatalogError> {
    if !root.is_dir() {
        return Err(CatalogError::NotADirectory(root.to_path_buf()));
    }

    let mut paths = Vec::new();
    walk_dir(root, &mut paths)?;
    paths.sort();

    Ok(paths
        .into_iter()
        .enumerate()
        .map(|(i, path)| story_from_file(i + 1, path))
        .collect())
}

fn walk_dir(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), CatalogError> {
    let io_err = |source| CatalogError::Io {
        path: dir.to_path_buf(),
        source,
    };

    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();

        if path.is_dir() {
            walk_dir(&path, out)?;
        } else if is_mp3(&path) {
            out.push(path);
        }
    }

    Ok(())
}

fn is_mp3(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("mp3"))
        .unwrap_or(false)
}

fn story_from_file(index: usize, path: PathBuf) -> Story {
    let tag = match Tag::read_from_path(&path) {
        Ok(tag) => Some(tag),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "no readable ID3 tag");
            None
        }
    };

    let title = tag
        .as_ref()
        .and_then(|t| t.title())
        .map(str::to_owned)
        .unwrap_or_else(|| filename_stem(&path));

    let description = tag
        .as_ref()
        .and_then(|t| t.comments().next().map(|c| c.text.clone()))
        .unwrap_or_default();

    let duration_label = tag
        .as_ref()
        .and_then(|t| t.get("TLEN"))
        .and_then(|f| f.content().text())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(duration_label)
        .unwrap_or_default();

    let age_range = tag
        .as_ref()
        .and_then(|t| {
            t.extended_texts()
                .find(|x| x.description.eq_ignore_ascii_case(AGE_RANGE_FRAME))
                .map(|x| x.value.clone())
        })
        .unwrap_or_default();

    Story {
        id: index.to_string(),
        title,
        description,
        duration_label,
        age_range,
        image_uri: String::new(),
        audio_uri: path.display().to_string(),
    }
}

/// Whole minutes, rounded up: 61_000 ms -> "2 min".
pub(crate) fn duration_label(ms: u64) -> String {
    let minutes = ms.div_ceil(60_000).max(1);
    format!("{minutes} min")
}

fn filename_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Untitled Story")
        .to_string()
}
