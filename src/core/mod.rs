//! core/mod.rs
//!
//! Everything that is not drawing:
//! - where stories come from (catalog)
//! - playing them (playback engine + controller)
//! - plain data structs for the GUI to render
//!
//! No Iced imports below this module.

pub mod catalog;
pub mod playback;
pub mod types;
