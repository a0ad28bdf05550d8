use crate::vm::StackItem;

/// Run modes for the debugger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Until a breakpoint or termination.
    Continue,
    /// Exactly `n` instructions, ignoring breakpoints.
    StepInto(usize),
    /// `n` instructions at the starting call depth or shallower; nested
    /// calls run to completion.
    StepOver(usize),
    /// Until the current frame returns.
    StepOut,
}

/// Where the instruction pointer rests after a stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub offset: usize,
    pub mnemonic: String,
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.offset, self.mnemonic)
    }
}

/// How a stepping command ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stop {
    Breakpoint(Position),
    Paused(Position),
    StepLimit(Position),
    /// The pointer ran past the last instruction, or the program had already
    /// terminated before the command.
    Finished,
    /// The program halted during this command; carries the final stack.
    Halted(Vec<StackItem>),
}
