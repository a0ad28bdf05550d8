use serde::Serialize;

use crate::vm::{LoadError, StackItem};

/// Result of executing one instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// More instructions remain.
    Ready,
    Halted,
    Faulted {
        offset: usize,
        mnemonic: String,
        reason: String,
    },
}

/// One invocation frame, described by the instruction it will run next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameInfo {
    #[serde(rename = "instructionPointer")]
    pub offset: usize,
    /// `None` once the frame's pointer has run past the end of the script.
    #[serde(rename = "nextInstruction")]
    pub mnemonic: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisassembledInstruction {
    pub offset: usize,
    pub mnemonic: String,
    /// Operand rendering: hex for data, decimal for targets and integers,
    /// the interop name for syscalls. Empty when there is no operand.
    pub parameter: String,
}

/// What the debugger needs from an instruction-execution engine.
///
/// The debugger only drives the engine through this trait, so tests can swap
/// in a scripted double.
pub trait ExecutionEngine {
    fn load(&mut self, script: &[u8]) -> Result<(), LoadError>;

    /// Executes exactly one instruction.
    fn step(&mut self) -> StepOutcome;

    /// Instruction pointer of the current frame, `None` when no frame is left.
    fn current_offset(&self) -> Option<usize>;

    /// Mnemonic at the instruction pointer, `None` past the end of the script.
    fn current_mnemonic(&self) -> Option<String>;

    fn invocation_depth(&self) -> usize;

    /// Bottom to top.
    fn evaluation_stack(&self) -> Vec<StackItem>;

    /// Outermost frame first.
    fn invocation_stack(&self) -> Vec<FrameInfo>;

    fn disassemble(&self) -> Vec<DisassembledInstruction>;

    fn push(&mut self, item: StackItem);
}
