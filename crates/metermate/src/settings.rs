use std::fs;
use std::io;
use std::path::Path;

use metermate_transport::DeviceAddress;
use serde::{Deserialize, Serialize};

use crate::exit::{io_error, CliError, CliResult, DATA_INVALID};

/// Values persisted between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub device_address: Option<DeviceAddress>,
}

impl Settings {
    /// Load settings, treating a missing file as empty.
    pub fn load(path: &Path) -> CliResult<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => {
                return Err(io_error(
                    &format!("failed reading {}", path.display()),
                    err,
                ))
            }
        };
        serde_json::from_str(&text).map_err(|err| {
            CliError::new(
                DATA_INVALID,
                format!("invalid settings file {}: {err}", path.display()),
            )
        })
    }

    pub fn save(&self, path: &Path) -> CliResult<()> {
        let mut text = serde_json::to_string_pretty(self).map_err(|err| {
            CliError::new(crate::exit::INTERNAL, format!("settings encode failed: {err}"))
        })?;
        text.push('\n');
        fs::write(path, text)
            .map_err(|err| io_error(&format!("failed writing {}", path.display()), err))
    }

    /// The saved device, if one is set and not blank.
    pub fn device(&self) -> Option<&DeviceAddress> {
        self.device_address.as_ref().filter(|addr| !addr.is_blank())
    }
}
