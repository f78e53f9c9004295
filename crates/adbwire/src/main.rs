mod cmd;
mod exit;
mod logging;
mod output;

use adbwire_client::{Context, DaemonAddr};
use adbwire_transport::{DEFAULT_HOST, DEFAULT_PORT};
use clap::Parser;

use crate::cmd::{Command, Target};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "adbwire", version, about = "Device-bridge daemon client")]
struct Cli {
    /// Daemon host.
    #[arg(
        short = 'H',
        long,
        env = "ANDROID_ADB_SERVER_ADDRESS",
        default_value = DEFAULT_HOST,
        global = true
    )]
    host: String,

    /// Daemon port.
    #[arg(
        short = 'P',
        long,
        env = "ANDROID_ADB_SERVER_PORT",
        default_value_t = DEFAULT_PORT,
        value_parser = clap::value_parser!(u16).range(1..),
        global = true
    )]
    port: u16,

    /// Serial of the device to use.
    #[arg(short = 's', long, env = "ANDROID_SERIAL", global = true)]
    serial: Option<String>,

    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        env = "ADBWIRE_LOG_LEVEL",
        default_value = "warn",
        global = true
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let target = Target {
        ctx: Context::new(DaemonAddr::new(cli.host, cli.port)),
        serial: cli.serial,
    };
    let result = cmd::run(cli.command, &target, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
