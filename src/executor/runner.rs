use std::fs;
use std::io::{self, BufRead, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;
use tracing::{debug, info};

use super::parse::parse_views;
use crate::debugger::{DebugContext, DebugError, ExecutionEngine, StackKind, Stop};
use crate::parser::{self, Command, COMMANDS};

pub const PROMPT: &str = "neovm> ";

/// Whether the loop should keep reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// How a stop is worded depends on the command that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Report {
    Breakpoint,
    InstructionPointer,
}

/// Reads commands from `input` until EOF or `exit`, writing responses to
/// `output`. Only I/O failures end the loop early.
pub fn run_debugger<E, R, W>(
    ctx: &mut DebugContext<E>,
    mut input: R,
    output: &mut W,
    prompt: bool,
) -> io::Result<()>
where
    E: ExecutionEngine + Default,
    R: BufRead,
    W: Write,
{
    let mut line = String::new();
    loop {
        if prompt {
            write!(output, "{PROMPT}")?;
            output.flush()?;
        }

        line.clear();
        if input.read_line(&mut line)? == 0 {
            debug!("end of input");
            return Ok(());
        }

        if execute_line(ctx, &line, output)? == Flow::Exit {
            info!("exit requested");
            return Ok(());
        }
        output.flush()?;
    }
}

/// Runs one command line. Command failures are written as `Error: ...`.
pub fn execute_line<E, W>(ctx: &mut DebugContext<E>, line: &str, output: &mut W) -> io::Result<Flow>
where
    E: ExecutionEngine + Default,
    W: Write,
{
    let command = match parser::parse_command(line) {
        Ok(Some(command)) => command,
        Ok(None) => return Ok(Flow::Continue),
        Err(err) => {
            writeln!(output, "Error: {err}")?;
            return Ok(Flow::Continue);
        }
    };
    debug!(?command, "dispatching");

    match dispatch(ctx, command, output) {
        Ok(flow) => Ok(flow),
        Err(Failure::Io(err)) => Err(err),
        Err(Failure::Command(err)) => {
            writeln!(output, "Error: {err}")?;
            Ok(Flow::Continue)
        }
    }
}

enum Failure {
    Command(DebugError),
    Io(io::Error),
}

impl From<DebugError> for Failure {
    fn from(err: DebugError) -> Self {
        Failure::Command(err)
    }
}

impl From<io::Error> for Failure {
    fn from(err: io::Error) -> Self {
        Failure::Io(err)
    }
}

fn dispatch<E, W>(ctx: &mut DebugContext<E>, command: Command, out: &mut W) -> Result<Flow, Failure>
where
    E: ExecutionEngine + Default,
    W: Write,
{
    match command {
        Command::Help => {
            writeln!(out, "Commands:")?;
            for info in COMMANDS {
                writeln!(out, "  {:<34}{}", info.usage, info.description)?;
            }
        }
        Command::Exit => return Ok(Flow::Exit),

        Command::LoadHex(arg) => {
            let text = parser::required(arg.as_deref(), "hex script")?;
            let script = hex::decode(text.strip_prefix("0x").unwrap_or(text))
                .map_err(|err| DebugError::InvalidParameter(format!("{text:?}: {err}")))?;
            load(ctx, &script, out)?;
        }
        Command::LoadBase64(arg) => {
            let text = parser::required(arg.as_deref(), "base64 script")?;
            let script = STANDARD
                .decode(text)
                .map_err(|err| DebugError::InvalidParameter(format!("{text:?}: {err}")))?;
            load(ctx, &script, out)?;
        }
        Command::LoadFile(arg) => {
            let path = parser::required(arg.as_deref(), "file")?;
            let script = fs::read(path).map_err(|source| DebugError::Read {
                path: path.to_string(),
                source,
            })?;
            load(ctx, &script, out)?;
        }

        Command::Break(arg) => {
            if !ctx.is_loaded() {
                return Err(DebugError::NotLoaded.into());
            }
            let offset = parser::parse_offset(parser::required(arg.as_deref(), "instruction")?)?;
            let offset = ctx.add_breakpoint(offset)?;
            writeln!(out, "breakpoint added at instruction {offset}")?;
        }
        Command::Cont => {
            let stop = ctx.cont()?;
            report(&stop, Report::Breakpoint, out)?;
        }
        Command::Run { method, params } => {
            if !ctx.is_loaded() {
                return Err(DebugError::NotLoaded.into());
            }
            let args = match method {
                Some(method) => {
                    let args = params
                        .iter()
                        .map(|param| parser::parse_param(param))
                        .collect::<Result<Vec<_>, _>>()?;
                    info!(%method, params = args.len(), "restarting program");
                    Some(args)
                }
                None => None,
            };
            let stop = ctx.run(args)?;
            report(&stop, Report::Breakpoint, out)?;
        }
        Command::Step(arg) => {
            if !ctx.is_loaded() {
                return Err(DebugError::NotLoaded.into());
            }
            let n = parser::parse_count(arg.as_deref())?;
            let stop = ctx.step(n)?;
            report(&stop, Report::Breakpoint, out)?;
        }
        Command::StepInto => {
            let stop = ctx.step_into()?;
            report(&stop, Report::InstructionPointer, out)?;
        }
        Command::StepOver(arg) => {
            if !ctx.is_loaded() {
                return Err(DebugError::NotLoaded.into());
            }
            let n = parser::parse_count(arg.as_deref())?;
            let stop = ctx.step_over(n)?;
            report(&stop, Report::InstructionPointer, out)?;
        }
        Command::StepOut => {
            let stop = ctx.step_out()?;
            report(&stop, Report::InstructionPointer, out)?;
        }

        Command::Ip => match ctx.position() {
            Ok(Some(position)) => writeln!(out, "instruction pointer at {position}")?,
            Ok(None) => writeln!(out, "execution has finished")?,
            Err(err) => writeln!(out, "{err}")?,
        },
        Command::Ops => match ctx.disassemble() {
            Ok(rows) => {
                writeln!(out, "INDEX OPCODE PARAMETER")?;
                for row in rows {
                    let line = format!("{} {} {}", row.offset, row.mnemonic, row.parameter);
                    writeln!(out, "{}", line.trim_end())?;
                }
            }
            Err(err) => writeln!(out, "{err}")?,
        },
        Command::EStack => snapshot(ctx, StackKind::Evaluation, out)?,
        Command::IStack => snapshot(ctx, StackKind::Invocation, out)?,

        Command::Parse(arg) => {
            let token = parser::required(arg.as_deref(), "argument")?;
            let views = parse_views(token);
            let width = views.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
            for (label, value) in views {
                writeln!(out, "{label:<width$}  {value}")?;
            }
        }
    }
    Ok(Flow::Continue)
}

fn load<E, W>(ctx: &mut DebugContext<E>, script: &[u8], out: &mut W) -> Result<(), Failure>
where
    E: ExecutionEngine + Default,
    W: Write,
{
    let n = ctx.load(script)?;
    writeln!(out, "READY: loaded {n} instructions")?;
    Ok(())
}

fn snapshot<E, W>(ctx: &DebugContext<E>, kind: StackKind, out: &mut W) -> io::Result<()>
where
    E: ExecutionEngine + Default,
    W: Write,
{
    match ctx.stack_snapshot(kind) {
        Ok(stack) => write_json(&stack, out),
        Err(err) => writeln!(out, "{err}"),
    }
}

fn report<W: Write>(stop: &Stop, form: Report, out: &mut W) -> io::Result<()> {
    match (stop, form) {
        (Stop::Breakpoint(position), _) | (Stop::Paused(position), Report::Breakpoint) => {
            writeln!(out, "at breakpoint {position}")
        }
        (Stop::Paused(position), Report::InstructionPointer) => {
            writeln!(out, "instruction pointer at {position}")
        }
        (Stop::StepLimit(position), _) => writeln!(out, "step limit reached at {position}"),
        (Stop::Finished, _) => writeln!(out, "execution has finished"),
        (Stop::Halted(stack), _) => write_json(stack, out),
    }
}

fn write_json<T: Serialize, W: Write>(value: &T, out: &mut W) -> io::Result<()> {
    let json = serde_json::to_string(value).map_err(io::Error::other)?;
    writeln!(out, "{json}")
}
