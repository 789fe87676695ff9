//! GUI renderer (reads state, produces widgets; no mutation).

mod constants;
mod stories;
mod widgets;

use iced::widget::{column, container, scrollable, text};
use iced::{Element, Length};

use super::state::{Message, Storynook};
use constants::{PAGE_PAD, STORY_SPACING, TITLE_TEXT};

pub(crate) fn view(state: &Storynook) -> Element<'_, Message> {
    let mut list = column![text("Discover Stories").size(TITLE_TEXT)].spacing(STORY_SPACING);

    for (i, story) in state.stories.iter().enumerate() {
        let surface = state
            .players
            .get(i)
            .map(|p| p.surface())
            .unwrap_or_default();
        list = list.push(stories::story_entry(i, story, surface));
    }

    scrollable(container(list).padding(PAGE_PAD).width(Length::Fill)).into()
}
