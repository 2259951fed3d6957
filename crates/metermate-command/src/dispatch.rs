use crate::command::{Command, Outcome};
use crate::decode::decode;
use crate::error::Result;
use crate::reading::{Celsius, Reading};

/// Map a decoded command to the reading it produces.
///
/// Unrecognized commands produce nothing; newer firmware may send commands
/// this build does not know about.
pub fn dispatch(command: &Command) -> Option<Reading> {
    match command {
        Command::GetTemperature(Outcome::Ready(temp)) => Some(Reading::Temperature(Celsius(*temp))),
        Command::GetTemperature(Outcome::Unavailable { .. }) => {
            Some(Reading::TemperatureUnavailable)
        }
        Command::GetStatus(Outcome::Ready(status)) => Some(Reading::Status(*status)),
        Command::GetStatus(Outcome::Unavailable { .. }) => Some(Reading::StatusUnavailable),
        Command::Unrecognized { name, .. } => {
            tracing::debug!(command = %name, "ignoring unrecognized command");
            None
        }
    }
}

/// Decode `text` and dispatch the resulting command.
pub fn decode_and_dispatch(text: &str) -> Result<Option<Reading>> {
    let command = decode(text)?;
    Ok(dispatch(&command))
}
