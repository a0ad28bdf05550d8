mod protocol;
mod server;

use std::io::{self, BufRead, Write};

use tracing::{debug, info, warn};

pub use protocol::{read_message, write_message, DapMessage, DapMessageContent};
pub use server::DapServer;

/// Serves DAP requests from `reader` until `disconnect` or end of input.
pub fn run_dap_mode<R: BufRead, W: Write>(
    reader: R,
    writer: W,
    step_limit: Option<usize>,
) -> io::Result<()> {
    info!("DAP server starting");
    let mut server = DapServer::new(reader, writer, step_limit);

    loop {
        let msg = match server.read_message() {
            Ok(Some(msg)) => msg,
            Ok(None) => {
                info!("client closed the stream");
                break;
            }
            Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                warn!(%err, "skipping malformed message");
                continue;
            }
            Err(err) => return Err(err),
        };

        let DapMessageContent::Request { command, arguments } = msg.content else {
            debug!("ignoring non-request message");
            continue;
        };
        debug!(%command, seq = msg.seq, "request");

        match command.as_str() {
            "initialize" => server.handle_initialize(msg.seq, command)?,
            "launch" => server.handle_launch(msg.seq, command, arguments)?,
            "setBreakpoints" => server.handle_set_breakpoints(msg.seq, command, arguments)?,
            "configurationDone" => server.handle_configuration_done(msg.seq, command)?,
            "threads" => server.handle_threads(msg.seq, command)?,
            "stackTrace" => server.handle_stack_trace(msg.seq, command)?,
            "scopes" => server.handle_scopes(msg.seq, command)?,
            "variables" => server.handle_variables(msg.seq, command, arguments)?,
            "source" => server.handle_source(msg.seq, command)?,
            "continue" => server.handle_continue(msg.seq, command)?,
            "next" => server.handle_next(msg.seq, command)?,
            "stepIn" => server.handle_step_in(msg.seq, command)?,
            "stepOut" => server.handle_step_out(msg.seq, command)?,
            "disconnect" => {
                server.send_response(msg.seq, command, true, None)?;
                break;
            }
            _ => {
                warn!(%command, "unhandled DAP command");
                let message = format!("unsupported request: {command}");
                server.send_error_response(msg.seq, command, message)?;
            }
        }
    }

    info!("DAP server exiting");
    Ok(())
}
