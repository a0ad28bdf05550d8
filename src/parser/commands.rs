use crate::debugger::DebugError;

/// One line of debugger input, tokenized but not yet validated.
///
/// Arguments stay raw so that "no program loaded" is reported ahead of
/// argument errors for commands that need a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Exit,
    LoadHex(Option<String>),
    LoadBase64(Option<String>),
    LoadFile(Option<String>),
    Break(Option<String>),
    Cont,
    Run {
        method: Option<String>,
        params: Vec<String>,
    },
    Step(Option<String>),
    StepInto,
    StepOver(Option<String>),
    StepOut,
    Ip,
    Ops,
    EStack,
    IStack,
    Parse(Option<String>),
}

pub struct CommandInfo {
    pub usage: &'static str,
    pub description: &'static str,
}

pub const COMMANDS: &[CommandInfo] = &[
    CommandInfo {
        usage: "break <ip>",
        description: "Place a breakpoint at the given instruction offset",
    },
    CommandInfo {
        usage: "cont",
        description: "Continue until the next breakpoint or the end of the program",
    },
    CommandInfo {
        usage: "estack",
        description: "Show the evaluation stack",
    },
    CommandInfo {
        usage: "exit",
        description: "Exit the debugger",
    },
    CommandInfo {
        usage: "help",
        description: "Show this list",
    },
    CommandInfo {
        usage: "ip",
        description: "Show the current instruction",
    },
    CommandInfo {
        usage: "istack",
        description: "Show the invocation stack",
    },
    CommandInfo {
        usage: "loadbase64 <string>",
        description: "Load a base64-encoded script",
    },
    CommandInfo {
        usage: "loadfile <file>",
        description: "Load a raw script from a file",
    },
    CommandInfo {
        usage: "loadhex <string>",
        description: "Load a hex-encoded script",
    },
    CommandInfo {
        usage: "ops",
        description: "Dump the loaded program's opcodes",
    },
    CommandInfo {
        usage: "parse <arg>",
        description: "Show the argument in every encoding it can be read as",
    },
    CommandInfo {
        usage: "run [<method> [<parameter>...]]",
        description: "Continue, or restart with typed parameters (int:, bool:, string:)",
    },
    CommandInfo {
        usage: "step [<n>]",
        description: "Execute n instructions (default 1)",
    },
    CommandInfo {
        usage: "stepinto",
        description: "Execute one instruction, entering calls",
    },
    CommandInfo {
        usage: "stepout",
        description: "Run until the current frame returns",
    },
    CommandInfo {
        usage: "stepover [<n>]",
        description: "Execute n instructions in the current frame, running calls to completion",
    },
];

/// Splits `line` shell-style and maps the first token to a command.
///
/// Returns `Ok(None)` for blank lines.
pub fn parse_command(line: &str) -> Result<Option<Command>, DebugError> {
    let tokens = shlex::split(line)
        .ok_or_else(|| DebugError::InvalidParameter(format!("unbalanced quotes in {line:?}")))?;
    let mut tokens = tokens.into_iter();
    let Some(name) = tokens.next() else {
        return Ok(None);
    };
    let command = match name.as_str() {
        "help" => Command::Help,
        "exit" | "quit" => Command::Exit,
        "loadhex" => Command::LoadHex(tokens.next()),
        "loadbase64" => Command::LoadBase64(tokens.next()),
        "loadfile" => Command::LoadFile(tokens.next()),
        "break" => Command::Break(tokens.next()),
        "cont" => Command::Cont,
        "run" => {
            let method = tokens.next();
            Command::Run {
                method,
                params: tokens.collect(),
            }
        }
        "step" => Command::Step(tokens.next()),
        "stepinto" => Command::StepInto,
        "stepover" => Command::StepOver(tokens.next()),
        "stepout" => Command::StepOut,
        "ip" => Command::Ip,
        "ops" => Command::Ops,
        "estack" => Command::EStack,
        "istack" => Command::IStack,
        "parse" => Command::Parse(tokens.next()),
        _ => return Err(DebugError::UnknownCommand(name.clone())),
    };
    Ok(Some(command))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_splits_method_and_params() {
        let cmd = parse_command(r#"run main int:1 "string:hello world""#).unwrap();
        assert_eq!(
            cmd,
            Some(Command::Run {
                method: Some("main".into()),
                params: vec!["int:1".into(), "string:hello world".into()],
            })
        );
    }

    #[test]
    fn blank_and_unknown_lines() {
        assert_eq!(parse_command("   ").unwrap(), None);
        assert!(matches!(
            parse_command("frobnicate"),
            Err(DebugError::UnknownCommand(name)) if name == "frobnicate"
        ));
        assert_eq!(parse_command("break").unwrap(), Some(Command::Break(None)));
    }

    #[test]
    fn help_lists_only_known_commands() {
        for info in COMMANDS {
            let word = info.usage.split_whitespace().next().unwrap();
            assert!(
                matches!(parse_command(word), Ok(Some(_))),
                "{} is not a command",
                word
            );
        }
    }
}
