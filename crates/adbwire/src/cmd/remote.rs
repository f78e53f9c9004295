use adbwire_client::{host, DaemonAddr};

use crate::cmd::{ConnectArgs, DisconnectArgs, Target};
use crate::exit::{client_error, CliError, CliResult, FAILURE, SUCCESS, USAGE};
use crate::output::{print_value, OutputFormat};

/// Port networked devices listen on unless told otherwise.
const DEFAULT_DEVICE_PORT: u16 = 5555;

pub fn connect(args: ConnectArgs, target: &Target, format: OutputFormat) -> CliResult<i32> {
    let (host_name, port) = split_host_port(&args.address)?;
    let port = port.unwrap_or(DEFAULT_DEVICE_PORT);
    let connected = host::remote_connect(&target.ctx, &host_name, port)
        .map_err(|err| client_error("connect failed", err))?;

    print_value("connected", &connected, format);
    if connected {
        Ok(SUCCESS)
    } else {
        Ok(FAILURE)
    }
}

pub fn disconnect(args: DisconnectArgs, target: &Target, format: OutputFormat) -> CliResult<i32> {
    let (host_name, port) = match args.address.as_deref() {
        Some(address) => {
            let (host_name, port) = split_host_port(address)?;
            (Some(host_name), port)
        }
        None => (None, None),
    };
    let response = host::remote_disconnect(&target.ctx, host_name.as_deref(), port)
        .map_err(|err| client_error("disconnect failed", err))?;
    print_value("response", &response, format);
    Ok(SUCCESS)
}

/// Split `HOST[:PORT]`, reporting whether a port was given.
fn split_host_port(input: &str) -> CliResult<(String, Option<u16>)> {
    let addr: DaemonAddr = input
        .parse()
        .map_err(|err| CliError::new(USAGE, format!("invalid address: {err}")))?;

    let explicit_port = input.trim().rsplit_once(':').is_some_and(|(head, tail)| {
        !tail.is_empty()
            && tail.bytes().all(|b| b.is_ascii_digit())
            && (head.ends_with(']') || !head.contains(':'))
    });
    Ok((addr.host, explicit_port.then_some(addr.port)))
}
