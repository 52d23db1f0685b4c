//! CLI command implementations.

pub mod check;
pub mod config;
pub mod exchange;
pub mod prefs;
pub mod token;
