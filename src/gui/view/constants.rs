//! View constants (layout/sizing).

pub(crate) const PAGE_PAD: f32 = 16.0;
pub(crate) const STORY_SPACING: f32 = 20.0;

pub(crate) const TITLE_TEXT: f32 = 32.0;
pub(crate) const STORY_TITLE_TEXT: f32 = 24.0;
pub(crate) const DESCRIPTION_TEXT: f32 = 16.0;
pub(crate) const META_TEXT: f32 = 14.0;
pub(crate) const TIME_TEXT: f32 = 12.0;

pub(crate) const PLAY_BUTTON_W: f32 = 72.0;

/// Seek slider step, as a fraction of the track.
pub(crate) const SEEK_STEP: f32 = 0.001;
