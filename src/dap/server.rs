use std::fs;
use std::io::{self, BufRead, Write};

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::protocol::{self, DapMessage, DapMessageContent};
use crate::debugger::{DebugContext, DebugError, StackKind, StackSnapshot, Stop};
use crate::vm::{StackItem, Vm};

const THREAD_ID: u64 = 1;
const SOURCE_REFERENCE: u64 = 1;
const EVALUATION_SCOPE: u64 = 1;
const INVOCATION_SCOPE: u64 = 2;

/// A Debug Adapter Protocol session over a byte stream pair.
///
/// Requests are handled one at a time; stepping requests run to their stop
/// before the next request is read.
pub struct DapServer<R, W> {
    reader: R,
    writer: W,
    seq: u64,
    context: DebugContext<Vm>,
    program_name: String,
    stop_on_entry: bool,
    /// Instruction offsets in program order; source line `n` is entry `n - 1`.
    offsets: Vec<usize>,
    requested_lines: Vec<u64>,
}

impl<R: BufRead, W: Write> DapServer<R, W> {
    pub fn new(reader: R, writer: W, step_limit: Option<usize>) -> Self {
        Self {
            reader,
            writer,
            seq: 0,
            context: DebugContext::new().with_step_limit(step_limit),
            program_name: "script".to_string(),
            stop_on_entry: true,
            offsets: Vec::new(),
            requested_lines: Vec::new(),
        }
    }

    pub fn context(&self) -> &DebugContext<Vm> {
        &self.context
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    pub fn read_message(&mut self) -> io::Result<Option<DapMessage>> {
        protocol::read_message(&mut self.reader)
    }

    pub fn send_response(
        &mut self,
        request_seq: u64,
        command: String,
        success: bool,
        body: Option<Value>,
    ) -> io::Result<()> {
        self.respond(request_seq, command, success, None, body)
    }

    pub fn send_error_response(
        &mut self,
        request_seq: u64,
        command: String,
        message: String,
    ) -> io::Result<()> {
        warn!(%command, %message, "request failed");
        self.respond(request_seq, command, false, Some(message), None)
    }

    fn respond(
        &mut self,
        request_seq: u64,
        command: String,
        success: bool,
        message: Option<String>,
        body: Option<Value>,
    ) -> io::Result<()> {
        let msg = DapMessage {
            seq: self.next_seq(),
            msg_type: "response".to_string(),
            content: DapMessageContent::Response {
                request_seq,
                success,
                command,
                message,
                body,
            },
        };
        protocol::write_message(&mut self.writer, &msg)
    }

    pub fn send_event(&mut self, event: &str, body: Option<Value>) -> io::Result<()> {
        debug!(event, "sending event");
        let msg = DapMessage {
            seq: self.next_seq(),
            msg_type: "event".to_string(),
            content: DapMessageContent::Event {
                event: event.to_string(),
                body,
            },
        };
        protocol::write_message(&mut self.writer, &msg)
    }

    pub fn handle_initialize(&mut self, seq: u64, command: String) -> io::Result<()> {
        let body = json!({
            "supportsConfigurationDoneRequest": true,
            "supportsStepBack": false,
            "supportsStepInTargetsRequest": false,
            "supportsFunctionBreakpoints": false,
            "supportsConditionalBreakpoints": false,
            "supportsSetVariable": false,
        });
        self.send_response(seq, command, true, Some(body))?;
        self.send_event("initialized", None)
    }

    pub fn handle_launch(&mut self, seq: u64, command: String, args: Option<Value>) -> io::Result<()> {
        let arg = |key: &str| {
            args.as_ref()
                .and_then(|v| v.get(key))
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        self.stop_on_entry = args
            .as_ref()
            .and_then(|v| v.get("stopOnEntry"))
            .and_then(Value::as_bool)
            .unwrap_or(true);

        let script = match (arg("program"), arg("script")) {
            (Some(path), _) => {
                self.program_name = path.clone();
                fs::read(&path).map_err(|source| DebugError::Read { path, source })
            }
            (None, Some(text)) => hex::decode(&text)
                .map_err(|err| DebugError::InvalidParameter(format!("script: {err}"))),
            (None, None) => Err(DebugError::MissingParameter("program")),
        };

        match script.and_then(|script| self.context.load(&script)) {
            Ok(bytes) => {
                info!(bytes, stop_on_entry = self.stop_on_entry, "launched");
                self.offsets = self.disassembly().iter().map(|(offset, _)| *offset).collect();
                self.apply_breakpoints();
                self.send_response(seq, command, true, None)
            }
            Err(err) => self.send_error_response(seq, command, err.to_string()),
        }
    }

    pub fn handle_set_breakpoints(
        &mut self,
        seq: u64,
        command: String,
        args: Option<Value>,
    ) -> io::Result<()> {
        self.requested_lines = args
            .as_ref()
            .and_then(|v| v.get("breakpoints"))
            .and_then(Value::as_array)
            .map(|bps| {
                bps.iter()
                    .filter_map(|bp| bp.get("line").and_then(Value::as_u64))
                    .collect()
            })
            .unwrap_or_default();

        let verified = self.apply_breakpoints();
        let breakpoints: Vec<Value> = self
            .requested_lines
            .iter()
            .zip(verified)
            .map(|(line, verified)| json!({ "verified": verified, "line": line }))
            .collect();
        self.send_response(seq, command, true, Some(json!({ "breakpoints": breakpoints })))
    }

    /// Maps the requested source lines onto instruction offsets. Returns
    /// whether each line landed on an instruction.
    fn apply_breakpoints(&mut self) -> Vec<bool> {
        self.context.clear_breakpoints();
        let mut verified = Vec::with_capacity(self.requested_lines.len());
        for line in &self.requested_lines {
            let offset = usize::try_from(*line)
                .ok()
                .and_then(|line| line.checked_sub(1))
                .and_then(|index| self.offsets.get(index).copied());
            let ok = match offset {
                Some(offset) => self.context.add_breakpoint(offset).is_ok(),
                None => false,
            };
            verified.push(ok);
        }
        verified
    }

    pub fn handle_configuration_done(&mut self, seq: u64, command: String) -> io::Result<()> {
        self.send_response(seq, command, true, None)?;
        if !self.context.is_loaded() {
            return Ok(());
        }
        if self.stop_on_entry {
            self.send_stopped("entry", None)
        } else {
            let result = self.context.cont();
            self.report(result, "step")
        }
    }

    pub fn handle_threads(&mut self, seq: u64, command: String) -> io::Result<()> {
        let body = json!({
            "threads": [
                {
                    "id": THREAD_ID,
                    "name": "NeoVM"
                }
            ]
        });
        self.send_response(seq, command, true, Some(body))
    }

    pub fn handle_stack_trace(&mut self, seq: u64, command: String) -> io::Result<()> {
        let frames = match self.context.stack_snapshot(StackKind::Invocation) {
            Ok(StackSnapshot::Invocation(frames)) => frames,
            _ => Vec::new(),
        };
        let depth = frames.len();
        let stack_frames: Vec<Value> = frames
            .iter()
            .rev()
            .enumerate()
            .map(|(i, frame)| {
                let name = match (depth - i, frame.mnemonic.as_deref()) {
                    (1, Some(mnemonic)) => format!("entry @ {mnemonic}"),
                    (1, None) => "entry".to_string(),
                    (level, Some(mnemonic)) => format!("call #{} @ {mnemonic}", level - 1),
                    (level, None) => format!("call #{}", level - 1),
                };
                json!({
                    "id": i,
                    "name": name,
                    "line": self.line_of(frame.offset),
                    "column": 1,
                    "source": {
                        "name": self.program_name,
                        "sourceReference": SOURCE_REFERENCE
                    }
                })
            })
            .collect();
        let body = json!({
            "stackFrames": stack_frames,
            "totalFrames": depth
        });
        self.send_response(seq, command, true, Some(body))
    }

    pub fn handle_scopes(&mut self, seq: u64, command: String) -> io::Result<()> {
        let body = json!({
            "scopes": [
                {
                    "name": "Evaluation Stack",
                    "variablesReference": EVALUATION_SCOPE,
                    "expensive": false
                },
                {
                    "name": "Invocation Stack",
                    "variablesReference": INVOCATION_SCOPE,
                    "expensive": false
                }
            ]
        });
        self.send_response(seq, command, true, Some(body))
    }

    pub fn handle_variables(&mut self, seq: u64, command: String, args: Option<Value>) -> io::Result<()> {
        let var_ref = args
            .as_ref()
            .and_then(|v| v.get("variablesReference"))
            .and_then(Value::as_u64)
            .unwrap_or(0);

        let kind = match var_ref {
            EVALUATION_SCOPE => Some(StackKind::Evaluation),
            INVOCATION_SCOPE => Some(StackKind::Invocation),
            _ => None,
        };
        let variables: Vec<Value> = match kind.map(|kind| self.context.stack_snapshot(kind)) {
            Some(Ok(StackSnapshot::Evaluation(items))) => items
                .iter()
                .rev()
                .enumerate()
                .map(|(i, item)| {
                    json!({
                        "name": format!("[{i}]"),
                        "value": describe(item),
                        "type": item.type_name(),
                        "variablesReference": 0
                    })
                })
                .collect(),
            Some(Ok(StackSnapshot::Invocation(frames))) => frames
                .iter()
                .rev()
                .enumerate()
                .map(|(i, frame)| {
                    json!({
                        "name": format!("[{i}]"),
                        "value": format!(
                            "{} {}",
                            frame.offset,
                            frame.mnemonic.as_deref().unwrap_or("<end>")
                        ),
                        "variablesReference": 0
                    })
                })
                .collect(),
            _ => Vec::new(),
        };
        self.send_response(seq, command, true, Some(json!({ "variables": variables })))
    }

    pub fn handle_source(&mut self, seq: u64, command: String) -> io::Result<()> {
        if !self.context.is_loaded() {
            return self.send_error_response(seq, command, DebugError::NotLoaded.to_string());
        }
        let content: String = self
            .disassembly()
            .into_iter()
            .map(|(_, line)| line + "\n")
            .collect();
        self.send_response(
            seq,
            command,
            true,
            Some(json!({ "content": content, "mimeType": "text/plain" })),
        )
    }

    pub fn handle_continue(&mut self, seq: u64, command: String) -> io::Result<()> {
        self.send_response(seq, command, true, Some(json!({ "allThreadsContinued": true })))?;
        let result = self.context.cont();
        self.report(result, "step")
    }

    pub fn handle_next(&mut self, seq: u64, command: String) -> io::Result<()> {
        self.send_response(seq, command, true, None)?;
        let result = self.context.step_over(1);
        self.report(result, "step")
    }

    pub fn handle_step_in(&mut self, seq: u64, command: String) -> io::Result<()> {
        self.send_response(seq, command, true, None)?;
        let result = self.context.step_into();
        self.report(result, "step")
    }

    pub fn handle_step_out(&mut self, seq: u64, command: String) -> io::Result<()> {
        self.send_response(seq, command, true, None)?;
        let result = self.context.step_out();
        self.report(result, "step")
    }

    /// Turns the outcome of a stepping request into events.
    fn report(&mut self, result: Result<Stop, DebugError>, reason: &str) -> io::Result<()> {
        match result {
            Ok(Stop::Breakpoint(_)) => self.send_stopped("breakpoint", None),
            Ok(Stop::Paused(_)) => self.send_stopped(reason, None),
            Ok(Stop::StepLimit(position)) => {
                self.send_stopped("pause", Some(format!("step limit reached at {position}")))
            }
            Ok(Stop::Finished) if self.context.state().is_terminal() => {
                self.send_event("terminated", None)
            }
            Ok(Stop::Finished) => {
                self.send_stopped(reason, Some("execution has finished".to_string()))
            }
            Ok(Stop::Halted(stack)) => {
                let json = serde_json::to_string(&stack).map_err(io::Error::other)?;
                self.send_output("stdout", format!("{json}\n"))?;
                self.send_event("terminated", None)
            }
            Err(err @ DebugError::Fault { .. }) => {
                let text = err.to_string();
                self.send_output("stderr", format!("Error: {text}\n"))?;
                self.send_stopped("exception", Some(text))
            }
            Err(err) => self.send_output("stderr", format!("Error: {err}\n")),
        }
    }

    fn send_stopped(&mut self, reason: &str, text: Option<String>) -> io::Result<()> {
        let mut body = json!({
            "reason": reason,
            "threadId": THREAD_ID,
            "allThreadsStopped": true
        });
        if let Some(text) = text {
            body["text"] = Value::String(text);
        }
        self.send_event("stopped", Some(body))
    }

    fn send_output(&mut self, category: &str, output: String) -> io::Result<()> {
        self.send_event(
            "output",
            Some(json!({ "category": category, "output": output })),
        )
    }

    fn disassembly(&self) -> Vec<(usize, String)> {
        self.context
            .disassemble()
            .unwrap_or_default()
            .into_iter()
            .map(|row| {
                let line = format!("{} {} {}", row.offset, row.mnemonic, row.parameter);
                (row.offset, line.trim_end().to_string())
            })
            .collect()
    }

    /// One-based source line of the instruction at `offset`; a pointer past
    /// the end maps to the last line.
    fn line_of(&self, offset: usize) -> usize {
        match self.offsets.binary_search(&offset) {
            Ok(index) => index + 1,
            Err(index) => index.max(1),
        }
    }
}

fn describe(item: &StackItem) -> String {
    match item {
        StackItem::Null => "null".to_string(),
        StackItem::Boolean(b) => b.to_string(),
        StackItem::Integer(n) => n.to_string(),
        StackItem::ByteString(bytes) => format!("0x{}", hex::encode(bytes)),
        StackItem::Pointer(offset) => format!("&{offset}"),
    }
}
