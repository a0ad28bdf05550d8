use std::fs;
use std::io::{self, IsTerminal, Write};

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use neovm_debugger::config::Config;
use neovm_debugger::dap;
use neovm_debugger::debugger::{DebugContext, DebugError};
use neovm_debugger::executor;
use neovm_debugger::vm::Vm;

fn main() -> io::Result<()> {
    let config = Config::parse();

    // stdout carries command output or DAP frames, so logs go to stderr.
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    if config.dap {
        info!("starting in DAP mode");
        let stdin = io::stdin();
        return dap::run_dap_mode(stdin.lock(), io::stdout().lock(), config.step_limit());
    }

    info!("starting in interactive mode");
    run_interactive_mode(&config)
}

fn run_interactive_mode(config: &Config) -> io::Result<()> {
    let mut ctx: DebugContext<Vm> = DebugContext::new().with_step_limit(config.step_limit());
    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();

    if let Some(result) = preload(config) {
        match result.and_then(|script| ctx.load(&script)) {
            Ok(n) => writeln!(stdout, "READY: loaded {n} instructions")?,
            Err(err) => writeln!(stdout, "Error: {err}")?,
        }
    }

    let prompt = stdin.is_terminal();
    executor::run_debugger(&mut ctx, stdin.lock(), &mut stdout, prompt)
}

fn preload(config: &Config) -> Option<Result<Vec<u8>, DebugError>> {
    if let Some(text) = &config.hex {
        return Some(
            hex::decode(text.strip_prefix("0x").unwrap_or(text))
                .map_err(|err| DebugError::InvalidParameter(format!("--hex: {err}"))),
        );
    }
    config.file.as_ref().map(|path| {
        fs::read(path).map_err(|source| DebugError::Read {
            path: path.display().to_string(),
            source,
        })
    })
}
