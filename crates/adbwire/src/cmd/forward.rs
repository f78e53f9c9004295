use adbwire_client::host;

use crate::cmd::{ForwardArgs, KillForwardArgs, Target};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_forwards, OutputFormat};

pub fn list(target: &Target, format: OutputFormat) -> CliResult<i32> {
    let forwards =
        host::list_forward(&target.ctx).map_err(|err| client_error("forwards failed", err))?;
    print_forwards(&forwards, format);
    Ok(SUCCESS)
}

pub fn forward(args: ForwardArgs, target: &Target) -> CliResult<i32> {
    let serial = target.device_serial()?;
    host::forward(
        &target.ctx,
        &serial,
        &args.local,
        &args.remote,
        args.no_rebind,
    )
    .map_err(|err| client_error("forward failed", err))?;
    Ok(SUCCESS)
}

pub fn kill(args: KillForwardArgs, target: &Target) -> CliResult<i32> {
    match args.local {
        Some(local) if !args.all => {
            let serial = target.device_serial()?;
            host::kill_forward(&target.ctx, &serial, &local)
                .map_err(|err| client_error("kill-forward failed", err))?;
        }
        _ => {
            host::kill_forward_all(&target.ctx)
                .map_err(|err| client_error("kill-forward failed", err))?;
        }
    }
    Ok(SUCCESS)
}
