//! Core data types shared between core logic and the UI.
//!
//! Boring bags of data: no GUI code, no filesystem code.

use serde::{Deserialize, Serialize};

/// One story as shown in the list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Human label like "5 min"; not used for playback.
    #[serde(default)]
    pub duration_label: String,
    /// Like "5-8".
    #[serde(default)]
    pub age_range: String,
    /// Cover art URI. Kept so catalog files round-trip; the list does not render images.
    #[serde(default)]
    pub image_uri: String,
    /// Local path, `file://` URI or `http(s)` URL handed to the playback engine.
    pub audio_uri: String,
}

impl Story {
    /// "5 min • Age 5-8", skipping whatever is missing.
    pub fn meta_line(&self) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(2);
        if !self.duration_label.is_empty() {
            parts.push(self.duration_label.clone());
        }
        if !self.age_range.is_empty() {
            parts.push(format!("Age {}", self.age_range));
        }
        parts.join(" • ")
    }
}
