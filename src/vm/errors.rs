use thiserror::Error;

/// Runtime faults raised while executing one instruction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    #[error("evaluation stack underflow")]
    StackUnderflow,
    #[error("evaluation stack exceeds {0} items")]
    StackOverflow(usize),
    #[error("invocation stack exceeds {0} frames")]
    InvocationOverflow(usize),
    #[error("no invocation frame")]
    NoFrame,
    #[error("ABORT instruction executed")]
    Abort,
    #[error("ABORTMSG: {0}")]
    AbortMessage(String),
    #[error("ASSERT failed")]
    AssertFailed,
    #[error("ASSERTMSG failed: {0}")]
    AssertMessage(String),
    #[error("unhandled exception: {0}")]
    Throw(String),
    #[error("jump target {0} is outside the script")]
    InvalidJump(i64),
    #[error("jump target {0} is not the start of an instruction")]
    MisalignedJump(usize),
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer result exceeds {0} bytes")]
    IntegerTooLarge(usize),
    #[error("item of {0} bytes exceeds the {1} byte limit")]
    ItemTooLarge(usize, usize),
    #[error("{0} cannot be converted to {1}")]
    InvalidConversion(&'static str, &'static str),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("slot index {0} is out of range")]
    InvalidSlot(usize),
    #[error("slot is not initialized")]
    SlotNotInitialized,
    #[error("unknown syscall 0x{0:08x}")]
    UnknownSyscall(u32),
    #[error("{0} is not supported by this engine")]
    Unsupported(&'static str),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error(transparent)]
    Decode(#[from] LoadError),
}

/// A script that cannot be decoded into instructions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("invalid opcode 0x{byte:02x} at offset {offset}")]
    InvalidOpcode { offset: usize, byte: u8 },
    #[error("instruction {mnemonic} at offset {offset} is truncated")]
    Truncated {
        offset: usize,
        mnemonic: &'static str,
    },
    #[error("script of {0} bytes exceeds the {1} byte limit")]
    TooLarge(usize, usize),
}
