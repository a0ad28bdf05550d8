mod arguments;
mod commands;

pub use arguments::{parse_count, parse_offset, parse_param, required};
pub use commands::{parse_command, Command, CommandInfo, COMMANDS};
