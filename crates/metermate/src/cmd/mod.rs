use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod device;
pub mod emulate;
pub mod monitor;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect to a device and print readings until stopped.
    Monitor(MonitorArgs),
    /// Decode one command record or captured frame bytes.
    Decode(DecodeArgs),
    /// Serve emulated device frames over TCP.
    Emulate(EmulateArgs),
    /// Show or save the device address.
    Device(DeviceArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, settings: &Path, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Monitor(args) => monitor::run(args, settings, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Emulate(args) => emulate::run(args, format),
        Command::Device(args) => device::run(args, settings, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Device address (tcp://host:port or unix:///path). Defaults to the saved device.
    pub address: Option<String>,
    /// Per-read timeout; bounds how long a stop request waits (e.g. 2s, 500ms, 0 to block).
    #[arg(long, default_value = "1s")]
    pub read_timeout: String,
    /// Stop after N readings.
    #[arg(long)]
    pub count: Option<NonZeroUsize>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Command record text, or frame bytes as hex with --hex.
    pub text: String,
    /// Treat TEXT as hex-encoded wire bytes including STX/ETX.
    #[arg(long)]
    pub hex: bool,
}

#[derive(Args, Debug)]
pub struct EmulateArgs {
    /// Address to listen on (host:port).
    #[arg(default_value = "127.0.0.1:4000")]
    pub bind: String,
    /// Delay between frames (e.g. 1s, 250ms).
    #[arg(long, default_value = "1s")]
    pub interval: String,
    /// Close the connection and exit after N frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Send booleans as True/False like older firmware.
    #[arg(long)]
    pub capitalized: bool,
}

#[derive(Args, Debug)]
pub struct DeviceArgs {
    #[command(subcommand)]
    pub command: DeviceCommand,
}

#[derive(Subcommand, Debug)]
pub enum DeviceCommand {
    /// Print the saved device address.
    Show,
    /// Save the device address used when monitor is given none.
    Save(DeviceSaveArgs),
}

#[derive(Args, Debug)]
pub struct DeviceSaveArgs {
    /// Device address to save.
    pub id: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `5s`, `500ms` or a bare number of seconds. Zero is allowed only
/// when `allow_zero` is set.
pub fn parse_duration(input: &str, allow_zero: bool) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 && !allow_zero {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

pub fn install_ctrlc_handler<F>(on_interrupt: F) -> CliResult<()>
where
    F: FnMut() + Send + 'static,
{
    ctrlc::set_handler(on_interrupt).map_err(|err| {
        CliError::new(INTERNAL, format!("signal handler setup failed: {err}"))
    })
}
