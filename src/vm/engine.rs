//! Stack-machine interpreter for NeoVM 3 scripts.
//!
//! One script, one shared evaluation stack, and an invocation stack of
//! frames that each carry their own instruction pointer and slots. Running
//! past the end of a frame's script acts as an implicit `RET`.

use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};
use tracing::{debug, info};

use super::errors::{LoadError, VmError};
use super::instruction::{instructions, Instruction};
use super::interop::{name_of, Interop};
use super::opcode::Opcode;
use super::serializer::{self, MAX_ITEM_SIZE};
use super::stack_item::{StackItem, MAX_INTEGER_SIZE};
use crate::bigint;
use crate::debugger::{DisassembledInstruction, ExecutionEngine, FrameInfo, StepOutcome};

pub const MAX_STACK_SIZE: usize = 2048;
pub const MAX_INVOCATION_DEPTH: usize = 1024;
pub const MAX_SHIFT: usize = 256;
pub const MAX_SCRIPT_SIZE: usize = MAX_ITEM_SIZE;

const TYPE_POINTER: u8 = 0x10;
const TYPE_BOOLEAN: u8 = 0x20;
const TYPE_INTEGER: u8 = 0x21;
const TYPE_BYTE_STRING: u8 = 0x28;

#[derive(Debug, Clone, Default)]
struct Frame {
    ip: usize,
    locals: Option<Vec<StackItem>>,
    arguments: Option<Vec<StackItem>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum VmState {
    Running,
    Halted,
    Faulted {
        offset: usize,
        mnemonic: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Static,
    Local,
    Argument,
}

#[derive(Debug, Clone)]
pub struct Vm {
    script: Rc<[u8]>,
    /// Offsets at which an instruction starts, ascending.
    boundaries: Rc<[usize]>,
    istack: Vec<Frame>,
    estack: Vec<StackItem>,
    static_fields: Option<Vec<StackItem>>,
    state: VmState,
}

impl Default for Vm {
    fn default() -> Self {
        Self {
            script: Rc::from(Vec::new()),
            boundaries: Rc::from(Vec::new()),
            istack: Vec::new(),
            estack: Vec::new(),
            static_fields: None,
            state: VmState::Halted,
        }
    }
}

impl Vm {
    pub fn new() -> Self {
        Self::default()
    }

    fn mnemonic_at(&self, offset: usize) -> Option<&'static str> {
        if offset >= self.script.len() {
            return None;
        }
        Instruction::decode(&self.script, offset)
            .ok()
            .map(|instr| instr.opcode.mnemonic())
    }

    /// Mnemonic for fault reports: `RET` past the end, the raw byte when it
    /// does not decode.
    fn label_at(&self, offset: usize) -> String {
        match (self.mnemonic_at(offset), self.script.get(offset)) {
            (Some(mnemonic), _) => mnemonic.to_string(),
            (None, Some(byte)) => format!("0x{byte:02x}"),
            (None, None) => "RET".to_string(),
        }
    }

    fn frame(&self) -> Result<&Frame, VmError> {
        self.istack.last().ok_or(VmError::NoFrame)
    }

    fn frame_mut(&mut self) -> Result<&mut Frame, VmError> {
        self.istack.last_mut().ok_or(VmError::NoFrame)
    }

    fn execute_next(&mut self) -> Result<(), VmError> {
        let script = Rc::clone(&self.script);
        let ip = self.frame()?.ip;
        if ip >= script.len() {
            return self.ret();
        }

        let instr = Instruction::decode(&script, ip)?;
        self.frame_mut()?.ip = instr.next_offset();
        self.execute(&instr)?;

        if self.estack.len() > MAX_STACK_SIZE {
            return Err(VmError::StackOverflow(MAX_STACK_SIZE));
        }
        Ok(())
    }

    fn execute(&mut self, instr: &Instruction<'_>) -> Result<(), VmError> {
        use Opcode::*;

        let op = instr.opcode;
        match op {
            PUSHINT8 | PUSHINT16 | PUSHINT32 | PUSHINT64 | PUSHINT128 | PUSHINT256 => {
                self.push(StackItem::Integer(bigint::from_bytes(instr.operand)));
            }
            PUSHT => self.push(StackItem::Boolean(true)),
            PUSHF => self.push(StackItem::Boolean(false)),
            PUSHA => {
                let target = self.target(instr)?;
                self.push(StackItem::Pointer(target));
            }
            PUSHNULL => self.push(StackItem::Null),
            PUSHDATA1 | PUSHDATA2 | PUSHDATA4 => {
                self.push(StackItem::ByteString(instr.operand.to_vec()));
            }
            PUSHM1 | PUSH0 | PUSH1 | PUSH2 | PUSH3 | PUSH4 | PUSH5 | PUSH6 | PUSH7 | PUSH8
            | PUSH9 | PUSH10 | PUSH11 | PUSH12 | PUSH13 | PUSH14 | PUSH15 | PUSH16 => {
                let n = i64::from(op as u8) - i64::from(PUSH0 as u8);
                self.push(StackItem::from(n));
            }

            NOP => {}
            JMP | JMP_L => self.jump(instr)?,
            JMPIF | JMPIF_L => {
                if self.pop()?.to_bool()? {
                    self.jump(instr)?;
                }
            }
            JMPIFNOT | JMPIFNOT_L => {
                if !self.pop()?.to_bool()? {
                    self.jump(instr)?;
                }
            }
            JMPEQ | JMPEQ_L | JMPNE | JMPNE_L | JMPGT | JMPGT_L | JMPGE | JMPGE_L | JMPLT
            | JMPLT_L | JMPLE | JMPLE_L => {
                let b = self.pop_int()?;
                let a = self.pop_int()?;
                let taken = match op {
                    JMPEQ | JMPEQ_L => a == b,
                    JMPNE | JMPNE_L => a != b,
                    JMPGT | JMPGT_L => a > b,
                    JMPGE | JMPGE_L => a >= b,
                    JMPLT | JMPLT_L => a < b,
                    _ => a <= b,
                };
                if taken {
                    self.jump(instr)?;
                }
            }
            CALL | CALL_L => {
                let target = self.target(instr)?;
                self.call(target)?;
            }
            CALLA => match self.pop()? {
                StackItem::Pointer(target) => self.call(target)?,
                other => return Err(VmError::InvalidConversion(other.type_name(), "Pointer")),
            },
            CALLT => return Err(VmError::Unsupported("CALLT")),
            ABORT => return Err(VmError::Abort),
            ASSERT => {
                if !self.pop()?.to_bool()? {
                    return Err(VmError::AssertFailed);
                }
            }
            THROW => {
                let message = self.pop_message()?;
                return Err(VmError::Throw(message));
            }
            TRY | TRY_L | ENDTRY | ENDTRY_L | ENDFINALLY => {
                return Err(VmError::Unsupported(op.mnemonic()))
            }
            RET => self.ret()?,
            SYSCALL => self.syscall(instr.operand_u32())?,

            DEPTH => self.push(StackItem::from(self.estack.len() as i64)),
            DROP => {
                self.pop()?;
            }
            NIP => {
                let index = self.index_from_top(1)?;
                self.estack.remove(index);
            }
            XDROP => {
                let n = self.pop_usize()?;
                let index = self.index_from_top(n)?;
                self.estack.remove(index);
            }
            CLEAR => self.estack.clear(),
            DUP => {
                let item = self.peek(0)?.clone();
                self.push(item);
            }
            OVER => {
                let item = self.peek(1)?.clone();
                self.push(item);
            }
            PICK => {
                let n = self.pop_usize()?;
                let item = self.peek(n)?.clone();
                self.push(item);
            }
            TUCK => {
                let item = self.peek(0)?.clone();
                let index = self.index_from_top(1)?;
                self.estack.insert(index, item);
            }
            SWAP => {
                let index = self.index_from_top(1)?;
                self.estack.swap(index, index + 1);
            }
            ROT => {
                let index = self.index_from_top(2)?;
                let item = self.estack.remove(index);
                self.push(item);
            }
            ROLL => {
                let n = self.pop_usize()?;
                let index = self.index_from_top(n)?;
                let item = self.estack.remove(index);
                self.push(item);
            }
            REVERSE3 => self.reverse_top(3)?,
            REVERSE4 => self.reverse_top(4)?,
            REVERSEN => {
                let n = self.pop_usize()?;
                self.reverse_top(n)?;
            }

            INITSSLOT => {
                let count = usize::from(instr.operand[0]);
                if count == 0 || self.static_fields.is_some() {
                    return Err(VmError::InvalidArgument("INITSSLOT".into()));
                }
                self.static_fields = Some(vec![StackItem::Null; count]);
            }
            INITSLOT => {
                let (locals, args) = (usize::from(instr.operand[0]), usize::from(instr.operand[1]));
                let frame = self.frame()?;
                if locals + args == 0 || frame.locals.is_some() || frame.arguments.is_some() {
                    return Err(VmError::InvalidArgument("INITSLOT".into()));
                }
                let mut arguments = Vec::with_capacity(args);
                for _ in 0..args {
                    arguments.push(self.pop()?);
                }
                let frame = self.frame_mut()?;
                if locals > 0 {
                    frame.locals = Some(vec![StackItem::Null; locals]);
                }
                if args > 0 {
                    frame.arguments = Some(arguments);
                }
            }
            LDSFLD0 | LDSFLD1 | LDSFLD2 | LDSFLD3 | LDSFLD4 | LDSFLD5 | LDSFLD6 => {
                self.load_slot(Slot::Static, usize::from(op as u8 - LDSFLD0 as u8))?
            }
            LDSFLD => self.load_slot(Slot::Static, usize::from(instr.operand[0]))?,
            STSFLD0 | STSFLD1 | STSFLD2 | STSFLD3 | STSFLD4 | STSFLD5 | STSFLD6 => {
                self.store_slot(Slot::Static, usize::from(op as u8 - STSFLD0 as u8))?
            }
            STSFLD => self.store_slot(Slot::Static, usize::from(instr.operand[0]))?,
            LDLOC0 | LDLOC1 | LDLOC2 | LDLOC3 | LDLOC4 | LDLOC5 | LDLOC6 => {
                self.load_slot(Slot::Local, usize::from(op as u8 - LDLOC0 as u8))?
            }
            LDLOC => self.load_slot(Slot::Local, usize::from(instr.operand[0]))?,
            STLOC0 | STLOC1 | STLOC2 | STLOC3 | STLOC4 | STLOC5 | STLOC6 => {
                self.store_slot(Slot::Local, usize::from(op as u8 - STLOC0 as u8))?
            }
            STLOC => self.store_slot(Slot::Local, usize::from(instr.operand[0]))?,
            LDARG0 | LDARG1 | LDARG2 | LDARG3 | LDARG4 | LDARG5 | LDARG6 => {
                self.load_slot(Slot::Argument, usize::from(op as u8 - LDARG0 as u8))?
            }
            LDARG => self.load_slot(Slot::Argument, usize::from(instr.operand[0]))?,
            STARG0 | STARG1 | STARG2 | STARG3 | STARG4 | STARG5 | STARG6 => {
                self.store_slot(Slot::Argument, usize::from(op as u8 - STARG0 as u8))?
            }
            STARG => self.store_slot(Slot::Argument, usize::from(instr.operand[0]))?,

            NEWBUFFER | MEMCPY => return Err(VmError::Unsupported(op.mnemonic())),
            CAT => {
                let b = self.pop()?.to_bytes()?;
                let mut a = self.pop()?.to_bytes()?;
                if a.len() + b.len() > MAX_ITEM_SIZE {
                    return Err(VmError::ItemTooLarge(a.len() + b.len(), MAX_ITEM_SIZE));
                }
                a.extend_from_slice(&b);
                self.push(StackItem::ByteString(a));
            }
            SUBSTR => {
                let count = self.pop_usize()?;
                let index = self.pop_usize()?;
                let bytes = self.pop()?.to_bytes()?;
                let slice = index
                    .checked_add(count)
                    .and_then(|end| bytes.get(index..end))
                    .ok_or_else(|| VmError::InvalidArgument("SUBSTR range".into()))?;
                self.push(StackItem::ByteString(slice.to_vec()));
            }
            LEFT => {
                let count = self.pop_usize()?;
                let bytes = self.pop()?.to_bytes()?;
                let slice = bytes
                    .get(..count)
                    .ok_or_else(|| VmError::InvalidArgument("LEFT count".into()))?;
                self.push(StackItem::ByteString(slice.to_vec()));
            }
            RIGHT => {
                let count = self.pop_usize()?;
                let bytes = self.pop()?.to_bytes()?;
                let start = bytes
                    .len()
                    .checked_sub(count)
                    .ok_or_else(|| VmError::InvalidArgument("RIGHT count".into()))?;
                self.push(StackItem::ByteString(bytes[start..].to_vec()));
            }

            INVERT => {
                let x = self.pop_int()?;
                self.push_int(!x)?;
            }
            AND | OR | XOR => {
                let b = self.pop_int()?;
                let a = self.pop_int()?;
                let result = match op {
                    AND => a & b,
                    OR => a | b,
                    _ => a ^ b,
                };
                self.push_int(result)?;
            }
            EQUAL | NOTEQUAL => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(StackItem::Boolean((a == b) == (op == EQUAL)));
            }

            SIGN => {
                let x = self.pop_int()?;
                self.push_int(x.signum())?;
            }
            ABS => {
                let x = self.pop_int()?;
                self.push_int(x.abs())?;
            }
            NEGATE => {
                let x = self.pop_int()?;
                self.push_int(-x)?;
            }
            INC => {
                let x = self.pop_int()?;
                self.push_int(x + 1)?;
            }
            DEC => {
                let x = self.pop_int()?;
                self.push_int(x - 1)?;
            }
            ADD | SUB | MUL | DIV | MOD => {
                let b = self.pop_int()?;
                let a = self.pop_int()?;
                if matches!(op, DIV | MOD) && b.is_zero() {
                    return Err(VmError::DivisionByZero);
                }
                let result = match op {
                    ADD => a + b,
                    SUB => a - b,
                    MUL => a * b,
                    DIV => a / b,
                    _ => a % b,
                };
                self.push_int(result)?;
            }
            POW => {
                let exponent = self.pop_int()?;
                let base = self.pop_int()?;
                let exponent = exponent
                    .to_u32()
                    .filter(|e| *e as usize <= MAX_SHIFT)
                    .ok_or_else(|| VmError::InvalidArgument(format!("exponent {exponent}")))?;
                self.push_int(base.pow(exponent))?;
            }
            SQRT => {
                let x = self.pop_int()?;
                if x.is_negative() {
                    return Err(VmError::InvalidArgument("square root of a negative value".into()));
                }
                self.push_int(x.sqrt())?;
            }
            MODMUL => {
                let modulus = self.pop_int()?;
                let b = self.pop_int()?;
                let a = self.pop_int()?;
                if modulus.is_zero() {
                    return Err(VmError::DivisionByZero);
                }
                self.push_int((a * b) % modulus)?;
            }
            MODPOW => {
                let modulus = self.pop_int()?;
                let exponent = self.pop_int()?;
                let base = self.pop_int()?;
                if modulus.is_zero() {
                    return Err(VmError::DivisionByZero);
                }
                if exponent.is_negative() {
                    return Err(VmError::InvalidArgument(format!("exponent {exponent}")));
                }
                self.push_int(base.modpow(&exponent, &modulus))?;
            }
            SHL | SHR => {
                let shift = self.pop_int()?;
                let shift = shift
                    .to_usize()
                    .filter(|s| *s <= MAX_SHIFT)
                    .ok_or_else(|| VmError::InvalidArgument(format!("shift {shift}")))?;
                let x = self.pop_int()?;
                let result = if op == SHL { x << shift } else { x >> shift };
                self.push_int(result)?;
            }
            NOT => {
                let b = self.pop()?.to_bool()?;
                self.push(StackItem::Boolean(!b));
            }
            BOOLAND | BOOLOR => {
                let b = self.pop()?.to_bool()?;
                let a = self.pop()?.to_bool()?;
                let result = if op == BOOLAND { a && b } else { a || b };
                self.push(StackItem::Boolean(result));
            }
            NZ => {
                let x = self.pop_int()?;
                self.push(StackItem::Boolean(!x.is_zero()));
            }
            NUMEQUAL | NUMNOTEQUAL | LT | LE | GT | GE => {
                let b = self.pop_int()?;
                let a = self.pop_int()?;
                let result = match op {
                    NUMEQUAL => a == b,
                    NUMNOTEQUAL => a != b,
                    LT => a < b,
                    LE => a <= b,
                    GT => a > b,
                    _ => a >= b,
                };
                self.push(StackItem::Boolean(result));
            }
            MIN | MAX => {
                let b = self.pop_int()?;
                let a = self.pop_int()?;
                let result = if op == MIN { a.min(b) } else { a.max(b) };
                self.push_int(result)?;
            }
            WITHIN => {
                let upper = self.pop_int()?;
                let lower = self.pop_int()?;
                let x = self.pop_int()?;
                self.push(StackItem::Boolean(lower <= x && x < upper));
            }

            PACKMAP | PACKSTRUCT | PACK | UNPACK | NEWARRAY0 | NEWARRAY | NEWARRAY_T
            | NEWSTRUCT0 | NEWSTRUCT | NEWMAP | SIZE | HASKEY | KEYS | VALUES | PICKITEM
            | APPEND | SETITEM | REVERSEITEMS | REMOVE | CLEARITEMS | POPITEM => {
                return Err(VmError::Unsupported(op.mnemonic()))
            }

            ISNULL => {
                let item = self.pop()?;
                self.push(StackItem::Boolean(item == StackItem::Null));
            }
            ISTYPE => {
                let item = self.pop()?;
                let matches = match instr.operand[0] {
                    0x00 => return Err(VmError::InvalidArgument("ISTYPE Any".into())),
                    TYPE_POINTER => matches!(item, StackItem::Pointer(_)),
                    TYPE_BOOLEAN => matches!(item, StackItem::Boolean(_)),
                    TYPE_INTEGER => matches!(item, StackItem::Integer(_)),
                    TYPE_BYTE_STRING => matches!(item, StackItem::ByteString(_)),
                    _ => false,
                };
                self.push(StackItem::Boolean(matches));
            }
            CONVERT => {
                let item = self.pop()?;
                let converted = match instr.operand[0] {
                    TYPE_BOOLEAN => StackItem::Boolean(item.to_bool()?),
                    TYPE_INTEGER => StackItem::Integer(item.to_integer()?),
                    TYPE_BYTE_STRING => StackItem::ByteString(item.to_bytes()?),
                    TYPE_POINTER if matches!(item, StackItem::Pointer(_)) => item,
                    _ => return Err(VmError::InvalidConversion(item.type_name(), "target type")),
                };
                self.push(converted);
            }

            ABORTMSG => {
                let message = self.pop_message()?;
                return Err(VmError::AbortMessage(message));
            }
            ASSERTMSG => {
                let message = self.pop_message()?;
                if !self.pop()?.to_bool()? {
                    return Err(VmError::AssertMessage(message));
                }
            }
        }
        Ok(())
    }

    fn push(&mut self, item: StackItem) {
        self.estack.push(item);
    }

    fn push_int(&mut self, n: BigInt) -> Result<(), VmError> {
        if bigint::encoded_len(&n) > MAX_INTEGER_SIZE {
            return Err(VmError::IntegerTooLarge(MAX_INTEGER_SIZE));
        }
        self.estack.push(StackItem::Integer(n));
        Ok(())
    }

    fn pop(&mut self) -> Result<StackItem, VmError> {
        self.estack.pop().ok_or(VmError::StackUnderflow)
    }

    fn pop_int(&mut self) -> Result<BigInt, VmError> {
        self.pop()?.to_integer()
    }

    fn pop_usize(&mut self) -> Result<usize, VmError> {
        let n = self.pop_int()?;
        n.to_usize()
            .ok_or_else(|| VmError::InvalidArgument(format!("{n} is not a valid count")))
    }

    fn pop_message(&mut self) -> Result<String, VmError> {
        let bytes = self.pop()?.to_bytes()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Position in `estack` of the item `n` places below the top.
    fn index_from_top(&self, n: usize) -> Result<usize, VmError> {
        self.estack
            .len()
            .checked_sub(n + 1)
            .ok_or(VmError::StackUnderflow)
    }

    fn peek(&self, n: usize) -> Result<&StackItem, VmError> {
        let index = self.index_from_top(n)?;
        Ok(&self.estack[index])
    }

    fn reverse_top(&mut self, n: usize) -> Result<(), VmError> {
        if n > self.estack.len() {
            return Err(VmError::StackUnderflow);
        }
        let start = self.estack.len() - n;
        self.estack[start..].reverse();
        Ok(())
    }

    fn target(&self, instr: &Instruction<'_>) -> Result<usize, VmError> {
        let target = instr.offset as i64 + instr.operand_i64();
        let target = usize::try_from(target)
            .ok()
            .filter(|t| *t <= self.script.len())
            .ok_or(VmError::InvalidJump(target))?;
        self.check_boundary(target)?;
        Ok(target)
    }

    /// Control may only land on the start of an instruction or the end of
    /// the script.
    fn check_boundary(&self, target: usize) -> Result<(), VmError> {
        if target == self.script.len() || self.boundaries.binary_search(&target).is_ok() {
            Ok(())
        } else {
            Err(VmError::MisalignedJump(target))
        }
    }

    fn jump(&mut self, instr: &Instruction<'_>) -> Result<(), VmError> {
        let target = self.target(instr)?;
        self.frame_mut()?.ip = target;
        Ok(())
    }

    fn call(&mut self, target: usize) -> Result<(), VmError> {
        if target > self.script.len() {
            return Err(VmError::InvalidJump(target as i64));
        }
        self.check_boundary(target)?;
        if self.istack.len() >= MAX_INVOCATION_DEPTH {
            return Err(VmError::InvocationOverflow(MAX_INVOCATION_DEPTH));
        }
        self.istack.push(Frame {
            ip: target,
            ..Frame::default()
        });
        Ok(())
    }

    fn ret(&mut self) -> Result<(), VmError> {
        self.istack.pop().ok_or(VmError::NoFrame)?;
        if self.istack.is_empty() {
            self.state = VmState::Halted;
        }
        Ok(())
    }

    fn slot(&mut self, slot: Slot) -> Result<&mut Vec<StackItem>, VmError> {
        let fields = match slot {
            Slot::Static => self.static_fields.as_mut(),
            Slot::Local => self.frame_mut()?.locals.as_mut(),
            Slot::Argument => self.frame_mut()?.arguments.as_mut(),
        };
        fields.ok_or(VmError::SlotNotInitialized)
    }

    fn load_slot(&mut self, slot: Slot, index: usize) -> Result<(), VmError> {
        let item = self
            .slot(slot)?
            .get(index)
            .cloned()
            .ok_or(VmError::InvalidSlot(index))?;
        self.push(item);
        Ok(())
    }

    fn store_slot(&mut self, slot: Slot, index: usize) -> Result<(), VmError> {
        let item = self.pop()?;
        let field = self
            .slot(slot)?
            .get_mut(index)
            .ok_or(VmError::InvalidSlot(index))?;
        *field = item;
        Ok(())
    }

    fn syscall(&mut self, id: u32) -> Result<(), VmError> {
        let Some(interop) = Interop::resolve(id) else {
            return Err(match name_of(id) {
                Some(name) => VmError::Unsupported(name),
                None => VmError::UnknownSyscall(id),
            });
        };
        match interop {
            Interop::BinarySerialize => {
                let item = self.pop()?;
                let bytes = serializer::serialize(&item)?;
                self.push(StackItem::ByteString(bytes));
            }
            Interop::BinaryDeserialize => {
                let bytes = self.pop()?.to_bytes()?;
                let item = serializer::deserialize(&bytes)?;
                self.push(item);
            }
            Interop::RuntimeLog => {
                let message = self.pop_message()?;
                info!(target: "neovm::runtime", "{message}");
            }
            Interop::RuntimePlatform => self.push(StackItem::from("NEO")),
        }
        Ok(())
    }

    fn parameter(&self, instr: &Instruction<'_>) -> String {
        use Opcode::*;

        match instr.opcode {
            PUSHINT8 | PUSHINT16 | PUSHINT32 | PUSHINT64 | PUSHINT128 | PUSHINT256 => {
                bigint::from_bytes(instr.operand).to_string()
            }
            JMP | JMP_L | JMPIF | JMPIF_L | JMPIFNOT | JMPIFNOT_L | JMPEQ | JMPEQ_L | JMPNE
            | JMPNE_L | JMPGT | JMPGT_L | JMPGE | JMPGE_L | JMPLT | JMPLT_L | JMPLE | JMPLE_L
            | CALL | CALL_L | PUSHA | ENDTRY | ENDTRY_L => {
                (instr.offset as i64 + instr.operand_i64()).to_string()
            }
            SYSCALL => {
                let id = instr.operand_u32();
                name_of(id).map_or_else(|| format!("0x{id:08x}"), str::to_string)
            }
            _ => hex::encode(instr.operand),
        }
    }
}

impl ExecutionEngine for Vm {
    fn load(&mut self, script: &[u8]) -> Result<(), LoadError> {
        if script.len() > MAX_SCRIPT_SIZE {
            return Err(LoadError::TooLarge(script.len(), MAX_SCRIPT_SIZE));
        }
        let boundaries = instructions(script)
            .map(|instr| instr.map(|instr| instr.offset))
            .collect::<Result<Vec<_>, _>>()?;
        let count = boundaries.len();

        *self = Self {
            script: Rc::from(script),
            boundaries: Rc::from(boundaries),
            istack: vec![Frame::default()],
            estack: Vec::new(),
            static_fields: None,
            state: VmState::Running,
        };
        debug!(bytes = script.len(), instructions = count, "script loaded");
        Ok(())
    }

    fn step(&mut self) -> StepOutcome {
        match &self.state {
            VmState::Halted => return StepOutcome::Halted,
            VmState::Faulted {
                offset,
                mnemonic,
                reason,
            } => {
                return StepOutcome::Faulted {
                    offset: *offset,
                    mnemonic: mnemonic.clone(),
                    reason: reason.clone(),
                }
            }
            VmState::Running => {}
        }
        let Some(offset) = self.current_offset() else {
            self.state = VmState::Halted;
            return StepOutcome::Halted;
        };

        match self.execute_next() {
            Ok(()) if self.state == VmState::Halted => StepOutcome::Halted,
            Ok(()) => StepOutcome::Ready,
            Err(err) => {
                let mnemonic = self.label_at(offset);
                let reason = err.to_string();
                debug!(offset, %mnemonic, %reason, "fault");
                self.state = VmState::Faulted {
                    offset,
                    mnemonic: mnemonic.clone(),
                    reason: reason.clone(),
                };
                StepOutcome::Faulted {
                    offset,
                    mnemonic,
                    reason,
                }
            }
        }
    }

    fn current_offset(&self) -> Option<usize> {
        self.istack.last().map(|frame| frame.ip)
    }

    fn current_mnemonic(&self) -> Option<String> {
        self.current_offset()
            .and_then(|ip| self.mnemonic_at(ip))
            .map(str::to_string)
    }

    fn invocation_depth(&self) -> usize {
        self.istack.len()
    }

    fn evaluation_stack(&self) -> Vec<StackItem> {
        self.estack.clone()
    }

    fn invocation_stack(&self) -> Vec<FrameInfo> {
        self.istack
            .iter()
            .map(|frame| FrameInfo {
                offset: frame.ip,
                mnemonic: self.mnemonic_at(frame.ip).map(str::to_string),
            })
            .collect()
    }

    fn disassemble(&self) -> Vec<DisassembledInstruction> {
        instructions(&self.script)
            .map_while(Result::ok)
            .map(|instr| DisassembledInstruction {
                offset: instr.offset,
                mnemonic: instr.opcode.mnemonic().to_string(),
                parameter: self.parameter(&instr),
            })
            .collect()
    }

    fn push(&mut self, item: StackItem) {
        self.estack.push(item);
    }
}
