use adbwire_client::{ClientError, ShellSession};
use tracing::debug;

use crate::cmd::{ShellArgs, Target};
use crate::exit::{client_error, CliError, CliResult, CANCELLED, INTERNAL, SUCCESS};
use crate::output::{print_line, OutputFormat};

pub fn run(args: ShellArgs, target: &Target, format: OutputFormat) -> CliResult<i32> {
    let serial = target.device_serial()?;
    let command = args.command.join(" ");

    let session = ShellSession::open(&target.ctx, &serial, &command)
        .map_err(|err| client_error("shell failed", err))?;

    let handle = session.close_handle();
    ctrlc::set_handler(move || handle.close())
        .map_err(|err| CliError::new(INTERNAL, format!("failed to install Ctrl-C handler: {err}")))?;

    match session.for_each_line(|line| print_line(&line, format)) {
        Ok(()) => Ok(SUCCESS),
        Err(ClientError::Cancelled) => {
            debug!("shell interrupted");
            Ok(CANCELLED)
        }
        Err(err) => Err(client_error("shell failed", err)),
    }
}
