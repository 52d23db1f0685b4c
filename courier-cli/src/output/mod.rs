//! Output formatting for CLI.

mod json;
mod text;

pub use json::{ErrorOutput, JsonFormatter, ProbeOutput, TokenStatus};
pub use text::TextFormatter;
