use std::path::Path;

use metermate_transport::DeviceAddress;
use serde::Serialize;

use crate::cmd::{DeviceArgs, DeviceCommand};
use crate::exit::{CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_json, OutputFormat};
use crate::settings::Settings;

#[derive(Serialize)]
struct DeviceOutput<'a> {
    device_address: Option<&'a str>,
    settings: String,
}

pub fn run(args: DeviceArgs, settings_path: &Path, format: OutputFormat) -> CliResult<i32> {
    let mut settings = Settings::load(settings_path)?;

    if let DeviceCommand::Save(save) = args.command {
        let address = DeviceAddress::new(save.id);
        if address.is_blank() {
            return Err(CliError::new(USAGE, "device address must not be blank"));
        }
        settings.device_address = Some(address);
        settings.save(settings_path)?;
    }

    let device = settings.device().map(DeviceAddress::as_str);
    match format {
        OutputFormat::Json => print_json(&DeviceOutput {
            device_address: device,
            settings: settings_path.display().to_string(),
        }),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("{}", device.unwrap_or("(no device saved)"));
        }
    }
    Ok(SUCCESS)
}
