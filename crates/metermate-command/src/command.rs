use serde::{Deserialize, Serialize};
use serde_json::json;

/// Discriminator of the get-temperature command.
pub const GET_TEMPERATURE: &str = "gt";
/// Discriminator of the get-status command.
pub const GET_STATUS: &str = "gs";

/// Command families known to this decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    GetTemperature,
    GetStatus,
}

impl CommandKind {
    /// Case-insensitive lookup of a discriminator.
    pub fn from_discriminator(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case(GET_TEMPERATURE) {
            Some(Self::GetTemperature)
        } else if name.eq_ignore_ascii_case(GET_STATUS) {
            Some(Self::GetStatus)
        } else {
            None
        }
    }

    /// Canonical wire discriminator.
    pub fn discriminator(self) -> &'static str {
        match self {
            Self::GetTemperature => GET_TEMPERATURE,
            Self::GetStatus => GET_STATUS,
        }
    }
}

/// Device-reported outcome of a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// `Result == 0`; the payload fields were present and valid.
    Ready(T),
    /// `Result != 0`; the device could not produce the value.
    Unavailable { code: i32 },
}

impl<T> Outcome<T> {
    pub fn result_code(&self) -> i32 {
        match self {
            Outcome::Ready(_) => 0,
            Outcome::Unavailable { code } => *code,
        }
    }
}

/// The four status flags reported by a `gs` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct MeterStatus {
    pub in_delivery_mode: bool,
    pub product_flowing: bool,
    pub error: bool,
    pub in_calibration: bool,
}

impl MeterStatus {
    /// Flags with their wire names, in display order.
    pub fn fields(&self) -> [(&'static str, bool); 4] {
        [
            ("InDeliveryMode", self.in_delivery_mode),
            ("ProductFlowing", self.product_flowing),
            ("Error", self.error),
            ("InCalibration", self.in_calibration),
        ]
    }
}

/// A decoded device command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `gt`: temperature in degrees Celsius.
    GetTemperature(Outcome<f64>),
    /// `gs`: delivery/flow/error/calibration flags.
    GetStatus(Outcome<MeterStatus>),
    /// Any other discriminator, kept for diagnostics.
    Unrecognized { name: String, result: i32 },
}

impl Command {
    /// The discriminator this command carries on the wire.
    pub fn name(&self) -> &str {
        match self {
            Command::GetTemperature(_) => GET_TEMPERATURE,
            Command::GetStatus(_) => GET_STATUS,
            Command::Unrecognized { name, .. } => name,
        }
    }

    pub fn result_code(&self) -> i32 {
        match self {
            Command::GetTemperature(outcome) => outcome.result_code(),
            Command::GetStatus(outcome) => outcome.result_code(),
            Command::Unrecognized { result, .. } => *result,
        }
    }

    /// Serialize back to the device's record format.
    ///
    /// Fields of unavailable outcomes are omitted.
    pub fn to_json(&self) -> String {
        let value = match self {
            Command::GetTemperature(Outcome::Ready(temp)) => json!({
                "Command": GET_TEMPERATURE,
                "Result": 0,
                "Temp": temp,
            }),
            Command::GetStatus(Outcome::Ready(status)) => json!({
                "Command": GET_STATUS,
                "Result": 0,
                "InDeliveryMode": status.in_delivery_mode,
                "ProductFlowing": status.product_flowing,
                "Error": status.error,
                "InCalibration": status.in_calibration,
            }),
            Command::GetTemperature(Outcome::Unavailable { code })
            | Command::GetStatus(Outcome::Unavailable { code }) => json!({
                "Command": self.name(),
                "Result": code,
            }),
            Command::Unrecognized { name, result } => json!({
                "Command": name,
                "Result": result,
            }),
        };
        value.to_string()
    }
}
