//! archive_harvest library
//!
//! Bounded cursor harvesting plus the two sources built on it: the
//! presidency article archive and a video channel's playlists.

pub mod config;
pub mod fetch;
pub mod harvest;
pub mod models;
pub mod outputs;
pub mod pipeline;
pub mod scrapers;
pub mod utils;
