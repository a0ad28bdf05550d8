use serde::Serialize;
use tracing::{debug, info, warn};

use super::breakpoints::Breakpoints;
use super::engine::{DisassembledInstruction, ExecutionEngine, FrameInfo, StepOutcome};
use super::errors::DebugError;
use super::stepping::{Position, RunMode, Stop};
use super::ExecutionState;
use crate::vm::StackItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackKind {
    Evaluation,
    Invocation,
}

/// A read-only copy of one of the engine's stacks, bottom to top.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StackSnapshot {
    Evaluation(Vec<StackItem>),
    Invocation(Vec<FrameInfo>),
}

/// One debugging session: the engine, its breakpoints and where it stands.
pub struct DebugContext<E> {
    engine: Option<E>,
    script: Vec<u8>,
    breakpoints: Breakpoints,
    state: ExecutionState,
    step_limit: Option<usize>,
}

impl<E: ExecutionEngine + Default> Default for DebugContext<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ExecutionEngine + Default> DebugContext<E> {
    pub fn new() -> Self {
        Self {
            engine: None,
            script: Vec::new(),
            breakpoints: Breakpoints::new(),
            state: ExecutionState::NotLoaded,
            step_limit: None,
        }
    }

    /// Bounds the number of instructions a single command may execute.
    pub fn with_step_limit(mut self, limit: Option<usize>) -> Self {
        self.step_limit = limit;
        self
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.engine.is_some()
    }

    pub fn breakpoints(&self) -> &Breakpoints {
        &self.breakpoints
    }

    pub fn engine(&self) -> Option<&E> {
        self.engine.as_ref()
    }

    /// Installs a fresh engine over `script`. Breakpoints survive; a script
    /// that fails to decode leaves the previous session untouched.
    pub fn load(&mut self, script: &[u8]) -> Result<usize, DebugError> {
        let mut engine = E::default();
        engine.load(script)?;
        self.engine = Some(engine);
        self.script = script.to_vec();
        self.state = ExecutionState::Ready;
        info!(
            bytes = script.len(),
            breakpoints = ?self.breakpoints.sorted(),
            "program loaded"
        );
        Ok(script.len())
    }

    pub fn add_breakpoint(&mut self, offset: usize) -> Result<usize, DebugError> {
        if self.engine.is_none() {
            return Err(DebugError::NotLoaded);
        }
        self.breakpoints.add(offset);
        Ok(offset)
    }

    pub fn remove_breakpoint(&mut self, offset: usize) -> bool {
        self.breakpoints.remove(offset)
    }

    pub fn clear_breakpoints(&mut self) {
        self.breakpoints.clear();
    }

    pub fn step(&mut self, n: usize) -> Result<Stop, DebugError> {
        self.drive(RunMode::StepInto(n))
    }

    pub fn step_into(&mut self) -> Result<Stop, DebugError> {
        self.drive(RunMode::StepInto(1))
    }

    pub fn step_over(&mut self, n: usize) -> Result<Stop, DebugError> {
        self.drive(RunMode::StepOver(n))
    }

    pub fn step_out(&mut self) -> Result<Stop, DebugError> {
        self.drive(RunMode::StepOut)
    }

    pub fn cont(&mut self) -> Result<Stop, DebugError> {
        self.drive(RunMode::Continue)
    }

    /// Continues, or with `args` restarts the program with them pushed so
    /// that the first argument ends up on top.
    pub fn run(&mut self, args: Option<Vec<StackItem>>) -> Result<Stop, DebugError> {
        if self.engine.is_none() {
            return Err(DebugError::NotLoaded);
        }
        if let Some(args) = args {
            let mut engine = E::default();
            engine.load(&self.script)?;
            for item in args.into_iter().rev() {
                engine.push(item);
            }
            self.engine = Some(engine);
            self.state = ExecutionState::Ready;
            debug!("program restarted with arguments");
        }
        self.cont()
    }

    /// `Ok(None)` once execution has finished.
    pub fn position(&self) -> Result<Option<Position>, DebugError> {
        let engine = self.engine.as_ref().ok_or(DebugError::NotLoaded)?;
        if self.state.is_terminal() {
            return Ok(None);
        }
        Ok(current_position(engine))
    }

    pub fn disassemble(&self) -> Result<Vec<DisassembledInstruction>, DebugError> {
        let engine = self.engine.as_ref().ok_or(DebugError::NotLoaded)?;
        Ok(engine.disassemble())
    }

    pub fn stack_snapshot(&self, kind: StackKind) -> Result<StackSnapshot, DebugError> {
        let engine = self.engine.as_ref().ok_or(DebugError::NotLoaded)?;
        Ok(match kind {
            StackKind::Evaluation => StackSnapshot::Evaluation(engine.evaluation_stack()),
            StackKind::Invocation => StackSnapshot::Invocation(engine.invocation_stack()),
        })
    }

    fn drive(&mut self, mode: RunMode) -> Result<Stop, DebugError> {
        let engine = self.engine.as_mut().ok_or(DebugError::NotLoaded)?;
        if self.state.is_terminal() {
            return Ok(Stop::Finished);
        }

        let start_depth = engine.invocation_depth();
        let mut executed = 0usize;
        let mut at_start_depth = 0usize;

        loop {
            if self.step_limit.is_some_and(|limit| executed >= limit) {
                warn!(executed, "step limit reached");
                self.state = ExecutionState::Break;
                return Ok(current_position(engine).map_or(Stop::Finished, Stop::StepLimit));
            }

            match engine.step() {
                StepOutcome::Ready => {}
                StepOutcome::Halted => {
                    self.state = ExecutionState::Halted;
                    info!(executed = executed + 1, "program halted");
                    return Ok(Stop::Halted(engine.evaluation_stack()));
                }
                StepOutcome::Faulted {
                    offset,
                    mnemonic,
                    reason,
                } => {
                    self.state = ExecutionState::Faulted;
                    warn!(offset, %mnemonic, %reason, "program faulted");
                    return Err(DebugError::Fault {
                        offset,
                        mnemonic,
                        reason,
                    });
                }
            }
            executed += 1;

            let depth = engine.invocation_depth();
            let on_breakpoint = engine
                .current_offset()
                .is_some_and(|offset| self.breakpoints.contains(offset));

            let paused = match mode {
                RunMode::Continue => false,
                RunMode::StepInto(n) => executed >= n,
                RunMode::StepOver(n) => {
                    if depth <= start_depth {
                        at_start_depth += 1;
                    }
                    at_start_depth >= n
                }
                RunMode::StepOut => depth < start_depth,
            };
            let hit = on_breakpoint && !matches!(mode, RunMode::StepInto(_));

            if hit || paused {
                self.state = ExecutionState::Break;
                let stop = match current_position(engine) {
                    None => Stop::Finished,
                    Some(position) if hit => Stop::Breakpoint(position),
                    Some(position) => Stop::Paused(position),
                };
                debug!(?mode, ?stop, executed, "stopped");
                return Ok(stop);
            }
        }
    }
}

fn current_position<E: ExecutionEngine>(engine: &E) -> Option<Position> {
    let offset = engine.current_offset()?;
    let mnemonic = engine.current_mnemonic()?;
    Some(Position { offset, mnemonic })
}
