//! Storynook
//!
//! A small desktop app (built with `iced`) that lists short audio stories and plays them.
//!
//! - `core` = stories + playback (engine thread, session state machine, controller)
//! - `gui`  = state, messages, update, view
//!
//! Each story has its own player. A player never decides on its own that audio is
//! playing: it asks the engine, then shows whatever the engine reports.

mod config;
mod core;
mod gui;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Settings;
use crate::core::catalog;
use crate::core::playback::{PlaybackEngine, RodioEngine};
use crate::gui::{Storynook, subscription, update, view};

fn main() -> anyhow::Result<()> {
    // Settings first: they carry the default log filter.
    let (settings, settings_err) = match Settings::load() {
        Ok(s) => (s, None),
        Err(e) => (Settings::default(), Some(e)),
    };

    init_tracing(&settings.log_filter);

    if let Some(err) = settings_err {
        warn!(error = %err, "settings unreadable, using defaults");
    }

    let stories = catalog::load(&settings).unwrap_or_else(|err| {
        warn!(error = %err, "story catalog unavailable, using built-in stories");
        catalog::builtin()
    });
    info!(count = stories.len(), "stories ready");

    let engine: Arc<dyn PlaybackEngine> =
        Arc::new(RodioEngine::start(settings.tick()).context("starting playback engine")?);

    iced::application(
        move || Storynook::new(stories.clone(), Arc::clone(&engine), &settings),
        update,
        view,
    )
    .title("Storynook")
    .subscription(subscription)
    .run()
    .map_err(|e| anyhow::anyhow!("ui event loop failed: {e}"))
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("storynook=info"));

    // Already set (tests, embedding) is fine.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
