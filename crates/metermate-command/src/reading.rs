use std::fmt;

use serde::Serialize;

use crate::command::MeterStatus;

/// A temperature in degrees Celsius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Celsius(pub f64);

impl fmt::Display for Celsius {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Ties round away from zero; `{:.1}` alone would round them to even.
        let tenths = (self.0 * 10.0).round() / 10.0;
        // Adding zero turns a rounded -0.0 into 0.0.
        write!(f, "{:.1} °C", tenths + 0.0)
    }
}

/// Which tracked value a reading updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingKind {
    Temperature,
    Status,
}

/// A dispatch-ready value for the presentation layer.
///
/// The `*Unavailable` variants mean the device answered but could not
/// produce the value. They are distinct from a lost connection, which is
/// reported through the session instead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "reading", content = "value", rename_all = "snake_case")]
pub enum Reading {
    Temperature(Celsius),
    TemperatureUnavailable,
    Status(MeterStatus),
    /// One failed status read invalidates all four flags.
    StatusUnavailable,
}

impl Reading {
    pub fn kind(&self) -> ReadingKind {
        match self {
            Reading::Temperature(_) | Reading::TemperatureUnavailable => ReadingKind::Temperature,
            Reading::Status(_) | Reading::StatusUnavailable => ReadingKind::Status,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Reading::Temperature(_) | Reading::Status(_))
    }

    /// The unavailable sentinel for a kind.
    pub fn unavailable(kind: ReadingKind) -> Self {
        match kind {
            ReadingKind::Temperature => Reading::TemperatureUnavailable,
            ReadingKind::Status => Reading::StatusUnavailable,
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Temperature(value) => write!(f, "temperature {value}"),
            Reading::TemperatureUnavailable => f.write_str("temperature unavailable"),
            Reading::Status(status) => {
                f.write_str("status")?;
                for (name, value) in status.fields() {
                    write!(f, " {name}={value}")?;
                }
                Ok(())
            }
            Reading::StatusUnavailable => f.write_str("status unavailable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn celsius_formats_one_decimal() {
        assert_eq!(Celsius(22.5).to_string(), "22.5 °C");
        assert_eq!(Celsius(22.0).to_string(), "22.0 °C");
        assert_eq!(Celsius(-3.26).to_string(), "-3.3 °C");
    }

    #[test]
    fn celsius_ties_round_away_from_zero() {
        assert_eq!(Celsius(22.25).to_string(), "22.3 °C");
        assert_eq!(Celsius(0.25).to_string(), "0.3 °C");
        assert_eq!(Celsius(-0.25).to_string(), "-0.3 °C");
        assert_eq!(Celsius(-0.04).to_string(), "0.0 °C");
    }

    #[test]
    fn kinds_and_sentinels() {
        assert_eq!(
            Reading::unavailable(ReadingKind::Temperature),
            Reading::TemperatureUnavailable
        );
        assert_eq!(Reading::StatusUnavailable.kind(), ReadingKind::Status);
        assert!(!Reading::StatusUnavailable.is_available());
        assert!(Reading::Temperature(Celsius(1.0)).is_available());
    }

    #[test]
    fn status_display_lists_flags() {
        let reading = Reading::Status(MeterStatus {
            in_delivery_mode: true,
            product_flowing: false,
            error: false,
            in_calibration: false,
        });
        assert_eq!(
            reading.to_string(),
            "status InDeliveryMode=true ProductFlowing=false Error=false InCalibration=false"
        );
    }

    #[test]
    fn serializes_tagged() {
        let json = serde_json::to_string(&Reading::Temperature(Celsius(22.5))).unwrap();
        assert_eq!(json, r#"{"reading":"temperature","value":22.5}"#);

        let json = serde_json::to_string(&Reading::StatusUnavailable).unwrap();
        assert_eq!(json, r#"{"reading":"status_unavailable"}"#);
    }
}
