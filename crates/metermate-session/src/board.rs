use metermate_command::{Celsius, MeterStatus, Reading};
use serde::Serialize;

use crate::sink::SessionEvent;

/// Text shown for a value that has not been read in this session.
pub const NOT_READ: &str = "Not yet read";
/// Text shown for a value the device could not provide.
pub const UNAVAILABLE: &str = "OBC not connected to meter";

/// Display state of one tracked value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Slot<T> {
    NotRead,
    Value(T),
    Unavailable,
}

impl<T> Slot<T> {
    fn render(&self, value: impl FnOnce(&T) -> String) -> String {
        match self {
            Slot::NotRead => NOT_READ.to_string(),
            Slot::Value(v) => value(v),
            Slot::Unavailable => UNAVAILABLE.to_string(),
        }
    }
}

/// Latest known value of every reading a session tracks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReadingBoard {
    pub temperature: Slot<Celsius>,
    pub status: Slot<MeterStatus>,
}

impl ReadingBoard {
    pub fn new() -> Self {
        Self {
            temperature: Slot::NotRead,
            status: Slot::NotRead,
        }
    }

    pub fn apply(&mut self, reading: &Reading) {
        match reading {
            Reading::Temperature(value) => self.temperature = Slot::Value(*value),
            Reading::TemperatureUnavailable => self.temperature = Slot::Unavailable,
            Reading::Status(status) => self.status = Slot::Value(*status),
            Reading::StatusUnavailable => self.status = Slot::Unavailable,
        }
    }

    /// Update from a session event. Returns whether anything changed.
    pub fn apply_event(&mut self, event: &SessionEvent) -> bool {
        let before = *self;
        match event {
            SessionEvent::Reading(reading) => self.apply(reading),
            SessionEvent::ConnectionLost(_) | SessionEvent::Stopped => self.mark_unavailable(),
            SessionEvent::FrameRejected(_) => {}
        }
        *self != before
    }

    pub fn mark_unavailable(&mut self) {
        self.temperature = Slot::Unavailable;
        self.status = Slot::Unavailable;
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Whether every tracked value is unavailable.
    pub fn is_all_unavailable(&self) -> bool {
        matches!(self.temperature, Slot::Unavailable) && matches!(self.status, Slot::Unavailable)
    }

    /// One labelled row per displayed value.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        let status_row = |pick: fn(&MeterStatus) -> bool| {
            self.status.render(|status| pick(status).to_string())
        };
        vec![
            ("Temperature", self.temperature.render(|t| t.to_string())),
            ("Delivery mode", status_row(|s| s.in_delivery_mode)),
            ("Product flowing", status_row(|s| s.product_flowing)),
            ("In error", status_row(|s| s.error)),
            ("In calibration", status_row(|s| s.in_calibration)),
        ]
    }
}

impl Default for ReadingBoard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status() -> MeterStatus {
        MeterStatus {
            in_delivery_mode: true,
            product_flowing: false,
            error: false,
            in_calibration: false,
        }
    }

    #[test]
    fn starts_not_read() {
        let board = ReadingBoard::new();
        assert!(board.rows().iter().all(|(_, text)| text == NOT_READ));
    }

    #[test]
    fn readings_fill_rows() {
        let mut board = ReadingBoard::new();
        board.apply(&Reading::Temperature(Celsius(22.5)));
        board.apply(&Reading::Status(status()));

        let rows = board.rows();
        assert_eq!(rows[0], ("Temperature", "22.5 °C".to_string()));
        assert_eq!(rows[1], ("Delivery mode", "true".to_string()));
        assert_eq!(rows[2], ("Product flowing", "false".to_string()));
    }

    #[test]
    fn failed_status_invalidates_all_four_flags() {
        let mut board = ReadingBoard::new();
        board.apply(&Reading::Temperature(Celsius(5.0)));
        board.apply(&Reading::Status(status()));
        board.apply(&Reading::StatusUnavailable);

        let rows = board.rows();
        assert_eq!(rows[0].1, "5.0 °C");
        assert!(rows[1..]
            .iter()
            .all(|(_, text)| text == "OBC not connected to meter"));
    }

    #[test]
    fn stop_marks_everything_unavailable() {
        let mut board = ReadingBoard::new();
        board.apply(&Reading::Temperature(Celsius(5.0)));
        assert!(board.apply_event(&SessionEvent::Stopped));
        assert!(board.is_all_unavailable());
        assert!(!board.apply_event(&SessionEvent::FrameRejected("x".into())));

        board.reset();
        assert_eq!(board, ReadingBoard::new());
    }
}
