use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use metermate_command::{Command, Reading};
use metermate_session::{ReadingBoard, SessionOutcome, StopReason};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ReadingOutput<'a> {
    #[serde(flatten)]
    reading: &'a Reading,
    display: String,
    timestamp: String,
}

/// Print one reading. In table format the whole board is redrawn.
pub fn print_reading(reading: &Reading, board: &ReadingBoard, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ReadingOutput {
                reading,
                display: reading_text(reading),
                timestamp: now_unix_seconds(),
            };
            print_json(&out);
        }
        OutputFormat::Table => print_board(board),
        OutputFormat::Pretty => println!("{reading}"),
    }
}

pub fn print_board(board: &ReadingBoard) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["READING", "VALUE"]);
    for (label, value) in board.rows() {
        table.add_row(vec![label.to_string(), value]);
    }
    println!("{table}");
}

#[derive(Serialize)]
struct OutcomeOutput<'a> {
    reason: String,
    message: Option<&'a str>,
    frames: u64,
    readings: u64,
    rejected: u64,
}

pub fn print_outcome(outcome: &SessionOutcome, format: OutputFormat) {
    let reason = format!("{:?}", outcome.reason);
    match format {
        OutputFormat::Json => print_json(&OutcomeOutput {
            reason: reason_name(outcome),
            message: outcome.reason.connection_lost_message(),
            frames: outcome.frames,
            readings: outcome.readings,
            rejected: outcome.rejected,
        }),
        OutputFormat::Table | OutputFormat::Pretty => println!(
            "session stopped: {reason} frames={} readings={} rejected={}",
            outcome.frames, outcome.readings, outcome.rejected
        ),
    }
}

#[derive(Serialize)]
struct DecodedOutput<'a> {
    command: &'a str,
    result: i32,
    reading: Option<&'a Reading>,
    display: Option<String>,
}

pub fn print_decoded(command: &Command, reading: Option<&Reading>, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&DecodedOutput {
            command: command.name(),
            result: command.result_code(),
            reading,
            display: reading.map(reading_text),
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COMMAND", "RESULT", "READING"])
                .add_row(vec![
                    command.name().to_string(),
                    command.result_code().to_string(),
                    reading.map_or_else(|| "-".to_string(), ToString::to_string),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => match reading {
            Some(reading) => println!("{} -> {reading}", command.name()),
            None => println!("{} -> no reading", command.name()),
        },
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

/// Operator-facing text for a reading's value.
fn reading_text(reading: &Reading) -> String {
    let mut board = ReadingBoard::new();
    board.apply(reading);
    match reading {
        Reading::Temperature(_) | Reading::TemperatureUnavailable => board
            .rows()
            .into_iter()
            .next()
            .map(|(_, value)| value)
            .unwrap_or_default(),
        Reading::Status(_) | Reading::StatusUnavailable => board
            .rows()
            .into_iter()
            .skip(1)
            .map(|(label, value)| format!("{label}: {value}"))
            .collect::<Vec<_>>()
            .join(", "),
    }
}

fn reason_name(outcome: &SessionOutcome) -> String {
    match outcome.reason {
        StopReason::Requested => "requested",
        StopReason::NoResponse => "no_response",
        StopReason::TransportFault(_) => "transport_fault",
    }
    .to_string()
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
