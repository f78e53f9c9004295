use std::path::{Path, PathBuf};

use adbwire_client::sync::{self, TransferProgress};
use tracing::debug;

use crate::cmd::{PullArgs, PushArgs, Target};
use crate::exit::{client_error, io_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_transfer, OutputFormat};

pub fn push(args: PushArgs, target: &Target, format: OutputFormat) -> CliResult<i32> {
    let metadata = std::fs::metadata(&args.local)
        .map_err(|err| io_error(&format!("cannot read {}", args.local.display()), err))?;
    if !metadata.is_file() {
        return Err(CliError::new(
            USAGE,
            format!("{} is not a regular file", args.local.display()),
        ));
    }
    let permissions = args
        .mode
        .unwrap_or_else(|| sync::local_permissions(&metadata));

    let serial = target.device_serial()?;
    let bytes = sync::push(
        &target.ctx,
        &serial,
        &args.local,
        &args.remote,
        permissions,
        log_progress,
    )
    .map_err(|err| client_error("push failed", err))?;

    print_transfer(
        "push",
        &args.local.display().to_string(),
        &args.remote,
        bytes,
        format,
    );
    Ok(SUCCESS)
}

pub fn pull(args: PullArgs, target: &Target, format: OutputFormat) -> CliResult<i32> {
    let local = match args.local {
        Some(path) => path,
        None => default_local_path(&args.remote)?,
    };

    let serial = target.device_serial()?;
    let bytes = sync::pull(&target.ctx, &serial, &args.remote, &local, log_progress)
        .map_err(|err| client_error("pull failed", err))?;

    print_transfer(
        "pull",
        &args.remote,
        &local.display().to_string(),
        bytes,
        format,
    );
    Ok(SUCCESS)
}

fn log_progress(progress: TransferProgress) {
    debug!(
        transferred = progress.transferred,
        total = progress.total,
        "transfer progress"
    );
}

/// The last component of a remote path, as a local file name.
fn default_local_path(remote: &str) -> CliResult<PathBuf> {
    remote
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .map(|name| Path::new(name).to_path_buf())
        .ok_or_else(|| {
            CliError::new(
                USAGE,
                format!("cannot derive a local name from {remote}; give LOCAL"),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_name_from_remote_path() {
        assert_eq!(
            default_local_path("/sdcard/DCIM/photo.jpg").expect("valid"),
            PathBuf::from("photo.jpg")
        );
        assert_eq!(
            default_local_path("/data/local/tmp/dir/").expect("valid"),
            PathBuf::from("dir")
        );
        assert!(default_local_path("/").is_err());
    }
}
