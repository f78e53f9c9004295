use adbwire_client::sync;

use crate::cmd::{PathArgs, Target};
use crate::exit::{client_error, CliResult, FAILURE, SUCCESS};
use crate::output::{print_entries, print_stat, OutputFormat};

pub fn stat(args: PathArgs, target: &Target, format: OutputFormat) -> CliResult<i32> {
    let serial = target.device_serial()?;
    let stat = sync::stat(&target.ctx, &serial, &args.path)
        .map_err(|err| client_error("stat failed", err))?;
    print_stat(&args.path, &stat, format);
    if stat.exists() {
        Ok(SUCCESS)
    } else {
        Ok(FAILURE)
    }
}

pub fn ls(args: PathArgs, target: &Target, format: OutputFormat) -> CliResult<i32> {
    let serial = target.device_serial()?;
    let mut entries = sync::list(&target.ctx, &serial, &args.path)
        .map_err(|err| client_error("ls failed", err))?;
    entries.retain(|entry| entry.name != "." && entry.name != "..");
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    print_entries(&entries, format);
    Ok(SUCCESS)
}
