use adbwire_client::host;

use crate::cmd::{DevicesArgs, Target};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_devices, print_list, print_value, OutputFormat};

pub fn devices(args: DevicesArgs, target: &Target, format: OutputFormat) -> CliResult<i32> {
    let devices = host::devices(&target.ctx, args.state)
        .map_err(|err| client_error("listing devices failed", err))?;
    print_devices(&devices, format);
    Ok(SUCCESS)
}

pub fn features(target: &Target, format: OutputFormat) -> CliResult<i32> {
    let features =
        host::features(&target.ctx).map_err(|err| client_error("features failed", err))?;
    print_list("FEATURE", &features, format);
    Ok(SUCCESS)
}

pub fn server_version(target: &Target, format: OutputFormat) -> CliResult<i32> {
    let version =
        host::version(&target.ctx).map_err(|err| client_error("server-version failed", err))?;
    print_value("version", &version, format);
    Ok(SUCCESS)
}

pub fn kill_server(target: &Target) -> CliResult<i32> {
    host::kill_server(&target.ctx).map_err(|err| client_error("kill-server failed", err))?;
    Ok(SUCCESS)
}
