//! One story entry: text block + its player bar.

use iced::widget::{Column, column, text};

use super::super::state::Message;
use super::constants::{DESCRIPTION_TEXT, META_TEXT, STORY_TITLE_TEXT};
use super::widgets::player_bar;
use crate::core::playback::SurfaceState;
use crate::core::types::Story;

pub(crate) fn story_entry(
    index: usize,
    story: &Story,
    surface: SurfaceState,
) -> Column<'_, Message> {
    let mut col = column![text(&story.title).size(STORY_TITLE_TEXT)].spacing(8);

    if !story.description.is_empty() {
        col = col.push(text(&story.description).size(DESCRIPTION_TEXT));
    }

    let meta = story.meta_line();
    if !meta.is_empty() {
        col = col.push(text(meta).size(META_TEXT));
    }

    col.push(player_bar(index, surface))
}
