mod breakpoints;
mod context;
mod engine;
mod errors;
mod stepping;

pub use breakpoints::Breakpoints;
pub use context::{DebugContext, StackKind, StackSnapshot};
pub use engine::{DisassembledInstruction, ExecutionEngine, FrameInfo, StepOutcome};
pub use errors::DebugError;
pub use stepping::{Position, RunMode, Stop};

/// Where a session stands between commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    NotLoaded,
    Ready,
    Break,
    Halted,
    Faulted,
}

impl ExecutionState {
    /// Halted and faulted sessions stay put until the next load.
    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionState::Halted | ExecutionState::Faulted)
    }
}
