//! gui/subscription.rs
//! Pump playback status by emitting a periodic TickPlayback message.

use iced::{Subscription, time};

use super::state::{Message, Storynook};

pub(crate) fn subscription(state: &Storynook) -> Subscription<Message> {
    if state.players.is_empty() {
        return Subscription::none();
    }

    time::every(state.tick).map(|_| Message::TickPlayback)
}
