mod address;
mod parse;
mod runner;

pub use parse::{parse_views, quote, View};
pub use runner::{execute_line, run_debugger, Flow, PROMPT};
