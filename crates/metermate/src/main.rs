mod cmd;
mod exit;
mod logging;
mod output;
mod settings;

use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "metermate", version, about = "Metering device monitor")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    /// Settings file holding the saved device address.
    #[arg(long, value_name = "FILE", default_value = "metermate.json", global = true)]
    settings: PathBuf,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, &cli.settings, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroUsize;

    use crate::cmd::DeviceCommand;

    #[test]
    fn monitor_rejects_zero_count() {
        let err = Cli::try_parse_from(["metermate", "monitor", "--count", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_monitor_with_overrides() {
        let cli = Cli::try_parse_from([
            "metermate",
            "monitor",
            "tcp://127.0.0.1:4000",
            "--read-timeout",
            "500ms",
            "--count",
            "3",
        ])
        .expect("monitor args should parse");

        match cli.command {
            Command::Monitor(args) => {
                assert_eq!(args.address.as_deref(), Some("tcp://127.0.0.1:4000"));
                assert_eq!(args.count.map(NonZeroUsize::get), Some(3));
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.settings, PathBuf::from("metermate.json"));
    }

    #[test]
    fn parses_device_save_with_global_settings() {
        let cli = Cli::try_parse_from([
            "metermate",
            "device",
            "save",
            "tcp://meter:4000",
            "--settings",
            "/tmp/mm.json",
        ])
        .expect("device args should parse");

        assert!(matches!(
            cli.command,
            Command::Device(ref args) if matches!(args.command, DeviceCommand::Save(_))
        ));
        assert_eq!(cli.settings, PathBuf::from("/tmp/mm.json"));
    }

    #[test]
    fn decode_requires_text() {
        let err = Cli::try_parse_from(["metermate", "decode"]).expect_err("text is required");
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }
}
