use std::io;

use thiserror::Error;

use crate::vm::LoadError;

#[derive(Debug, Error)]
pub enum DebugError {
    #[error("missing argument: {0}")]
    MissingParameter(&'static str),
    #[error("can't parse argument: {0}")]
    InvalidParameter(String),
    #[error("no program loaded")]
    NotLoaded,
    #[error("at instruction {offset} ({mnemonic}): {reason}")]
    Fault {
        offset: usize,
        mnemonic: String,
        reason: String,
    },
    #[error("failed to load program: {0}")]
    Load(#[from] LoadError),
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("unknown command: {0}")]
    UnknownCommand(String),
}
