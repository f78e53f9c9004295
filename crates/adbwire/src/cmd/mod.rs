use std::path::PathBuf;

use adbwire_client::{host, Context, DeviceState};
use clap::{Args, Subcommand};

use crate::exit::{client_error, CliError, CliResult, FAILURE, USAGE};
use crate::output::OutputFormat;

pub mod device;
pub mod files;
pub mod forward;
pub mod remote;
pub mod server;
pub mod shell;
pub mod transfer;
pub mod version;

/// Where commands are sent: the daemon, and optionally one device.
#[derive(Debug)]
pub struct Target {
    pub ctx: Context,
    pub serial: Option<String>,
}

impl Target {
    /// The device to talk to: the one named with `--serial`, or else the only
    /// attached device that is online.
    pub fn device_serial(&self) -> CliResult<String> {
        if let Some(serial) = &self.serial {
            return Ok(serial.clone());
        }

        let online = host::devices(&self.ctx, Some(DeviceState::Device))
            .map_err(|err| client_error("listing devices failed", err))?;
        match online.as_slice() {
            [device] => Ok(device.serial().to_string()),
            [] => Err(CliError::new(FAILURE, "no online device found")),
            _ => Err(CliError::new(
                USAGE,
                "more than one device online; choose one with --serial",
            )),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List attached devices.
    Devices(DevicesArgs),
    /// List features supported by the daemon.
    Features,
    /// Print the daemon's protocol version.
    ServerVersion,
    /// Ask the daemon to exit.
    KillServer,
    /// List port forwards.
    Forwards,
    /// Forward a host socket to a device socket.
    Forward(ForwardArgs),
    /// Remove one port forward, or all of them.
    KillForward(KillForwardArgs),
    /// Connect to a device over the network.
    Connect(ConnectArgs),
    /// Disconnect a networked device, or all of them.
    Disconnect(DisconnectArgs),
    /// Run a shell command on the device and stream its output.
    Shell(ShellArgs),
    /// Copy a local file to the device.
    Push(PushArgs),
    /// Copy a file from the device.
    Pull(PullArgs),
    /// Show metadata of a remote path.
    Stat(PathArgs),
    /// List a remote directory.
    Ls(PathArgs),
    /// Print device system properties.
    Getprop(GetpropArgs),
    /// Reboot the device.
    Reboot(RebootArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, target: &Target, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Devices(args) => server::devices(args, target, format),
        Command::Features => server::features(target, format),
        Command::ServerVersion => server::server_version(target, format),
        Command::KillServer => server::kill_server(target),
        Command::Forwards => forward::list(target, format),
        Command::Forward(args) => forward::forward(args, target),
        Command::KillForward(args) => forward::kill(args, target),
        Command::Connect(args) => remote::connect(args, target, format),
        Command::Disconnect(args) => remote::disconnect(args, target, format),
        Command::Shell(args) => shell::run(args, target, format),
        Command::Push(args) => transfer::push(args, target, format),
        Command::Pull(args) => transfer::pull(args, target, format),
        Command::Stat(args) => files::stat(args, target, format),
        Command::Ls(args) => files::ls(args, target, format),
        Command::Getprop(args) => device::getprop(args, target, format),
        Command::Reboot(args) => device::reboot(args, target),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct DevicesArgs {
    /// Only list devices in this state (device, offline, bootloader, ...).
    #[arg(long)]
    pub state: Option<DeviceState>,
}

#[derive(Args, Debug)]
pub struct ForwardArgs {
    /// Host side, e.g. tcp:8080.
    pub local: String,
    /// Device side, e.g. tcp:80 or localabstract:name.
    pub remote: String,
    /// Fail instead of replacing an existing forward on LOCAL.
    #[arg(long)]
    pub no_rebind: bool,
}

#[derive(Args, Debug)]
pub struct KillForwardArgs {
    /// Host side of the forward to remove.
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub local: Option<String>,
    /// Remove every forward on every device.
    #[arg(long)]
    pub all: bool,
}

#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// HOST[:PORT] of the device; port defaults to 5555.
    pub address: String,
}

#[derive(Args, Debug)]
pub struct DisconnectArgs {
    /// HOST[:PORT] of the device; all devices when omitted.
    pub address: Option<String>,
}

#[derive(Args, Debug)]
pub struct ShellArgs {
    /// Command and arguments, joined with spaces.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

#[derive(Args, Debug)]
pub struct PushArgs {
    /// Local file.
    pub local: PathBuf,
    /// Destination path on the device.
    pub remote: String,
    /// Octal permission bits; defaults to the local file's.
    #[arg(long, value_parser = parse_octal_mode)]
    pub mode: Option<u32>,
}

#[derive(Args, Debug)]
pub struct PullArgs {
    /// Path on the device.
    pub remote: String,
    /// Local destination; defaults to the remote file name.
    pub local: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct PathArgs {
    /// Path on the device.
    pub path: String,
}

#[derive(Args, Debug)]
pub struct GetpropArgs {
    /// Property name; all properties when omitted.
    pub name: Option<String>,
}

#[derive(Args, Debug)]
pub struct RebootArgs {
    /// bootloader, recovery, sideload, ...
    pub target: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_octal_mode(input: &str) -> Result<u32, String> {
    let digits = input.trim_start_matches("0o");
    match u32::from_str_radix(digits, 8) {
        Ok(mode) if mode <= 0o7777 => Ok(mode),
        Ok(_) => Err(format!("mode {input} exceeds 7777")),
        Err(_) => Err(format!("mode {input} is not octal")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn octal_modes() {
        assert_eq!(parse_octal_mode("644"), Ok(0o644));
        assert_eq!(parse_octal_mode("0o4755"), Ok(0o4755));
        assert!(parse_octal_mode("999").is_err());
        assert!(parse_octal_mode("17777").is_err());
    }
}
