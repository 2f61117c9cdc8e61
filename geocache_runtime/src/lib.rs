//! Command surface for geocache sessions.
//!
//! Re-exports the data contracts from `geocache_proto` and turns text lines or
//! JSON envelopes into [`SessionCommand`] values without depending on the Bevy
//! runtime in `geocache_sim`.

pub use geocache_proto::*;

mod command_text;
mod commands;

pub use command_text::{parse_command_line, CommandParseError};
pub use commands::{CommandDecodeError, CommandEnvelope, SessionCommand, MAX_REPEAT};
