//! Core domain + application logic for the media relay bot.
//!
//! This crate is intentionally framework-agnostic. Telegram lives behind the
//! messaging port implemented in the adapter crate.

pub mod audit;
pub mod config;
pub mod directory;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod media;
pub mod media_group;
pub mod messaging;
pub mod pacing;
pub mod relay;

pub use errors::{Error, Result};
