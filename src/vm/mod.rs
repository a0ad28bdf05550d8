mod engine;
mod errors;
mod instruction;
pub mod interop;
mod opcode;
pub mod serializer;
mod stack_item;

pub use engine::{Vm, MAX_INVOCATION_DEPTH, MAX_STACK_SIZE};
pub use errors::{LoadError, VmError};
pub use instruction::{instructions, Instruction};
pub use opcode::{Opcode, Operand};
pub use stack_item::{StackItem, MAX_INTEGER_SIZE};
