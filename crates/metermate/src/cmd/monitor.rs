use std::num::NonZeroUsize;
use std::path::Path;

use metermate_session::{
    ChannelSink, ReadingBoard, SessionConfig, SessionController, SessionEvent,
};
use metermate_transport::{DeviceAddress, SocketConnector};
use tracing::{info, warn};

use crate::cmd::{install_ctrlc_handler, parse_duration, MonitorArgs};
use crate::exit::{session_error, stop_reason, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_board, print_outcome, print_reading, OutputFormat};
use crate::settings::Settings;

pub fn run(args: MonitorArgs, settings: &Path, format: OutputFormat) -> CliResult<i32> {
    let address = resolve_address(args.address.as_deref(), settings)?;
    let read_timeout = parse_duration(&args.read_timeout, true)?;
    let config = SessionConfig::new(address).with_read_timeout(read_timeout);

    let mut controller = SessionController::new(SocketConnector::new(), config);
    let stop = controller.stop_token();
    install_ctrlc_handler(move || stop.request_stop())?;

    let (sink, events) = ChannelSink::new();
    controller
        .start(sink)
        .map_err(|err| session_error("start failed", err))?;

    let mut board = ReadingBoard::new();
    let mut count = ReadingCount::new(args.count);

    // The channel closes when the worker drops its sink.
    for event in events.iter() {
        board.apply_event(&event);
        match event {
            SessionEvent::Reading(reading) if !count.reached() => {
                print_reading(&reading, &board, format);
                if count.record() {
                    // Already stopped if the device hung up meanwhile.
                    let _ = controller.stop();
                }
            }
            SessionEvent::Reading(_) => {}
            SessionEvent::FrameRejected(reason) => warn!(%reason, "frame rejected"),
            SessionEvent::ConnectionLost(message) => {
                count.close();
                warn!(%message, "connection lost");
            }
            SessionEvent::Stopped => info!("session stopped"),
        }
    }

    let outcome = controller
        .join()
        .map_err(|err| session_error("session failed", err))?
        .ok_or_else(|| CliError::new(crate::exit::INTERNAL, "session did not run"))?;

    if matches!(format, OutputFormat::Table) {
        print_board(&board);
    }
    print_outcome(&outcome, format);

    if count.reached() {
        return Ok(SUCCESS);
    }
    stop_reason(&outcome.reason)
}

/// Counts readings against `--count`.
///
/// Sentinels that follow a lost connection do not count.
#[derive(Debug)]
struct ReadingCount {
    limit: Option<usize>,
    seen: usize,
    closed: bool,
}

impl ReadingCount {
    fn new(limit: Option<NonZeroUsize>) -> Self {
        Self {
            limit: limit.map(NonZeroUsize::get),
            seen: 0,
            closed: false,
        }
    }

    /// Count one reading. Returns true when it reaches the limit.
    fn record(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.seen = self.seen.saturating_add(1);
        self.limit == Some(self.seen)
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn reached(&self) -> bool {
        self.limit.is_some_and(|limit| self.seen >= limit)
    }
}

fn resolve_address(explicit: Option<&str>, settings: &Path) -> CliResult<DeviceAddress> {
    if let Some(address) = explicit {
        return Ok(DeviceAddress::new(address));
    }
    Settings::load(settings)?.device().cloned().ok_or_else(|| {
        CliError::new(
            USAGE,
            "no device address: pass one or run `metermate device save <ID>`",
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_address_wins_over_settings() {
        let address =
            resolve_address(Some("tcp://10.0.0.5:4000"), Path::new("/nonexistent/mm.json"))
                .unwrap();
        assert_eq!(address.as_str(), "tcp://10.0.0.5:4000");
    }

    #[test]
    fn readings_after_connection_lost_do_not_count() {
        let mut count = ReadingCount::new(NonZeroUsize::new(3));
        assert!(!count.record());
        count.close();
        assert!(!count.record());
        assert!(!count.record());
        assert!(!count.reached());
    }

    #[test]
    fn limit_is_reached_once() {
        let mut count = ReadingCount::new(NonZeroUsize::new(2));
        assert!(!count.record());
        assert!(count.record());
        assert!(count.reached());

        let mut unlimited = ReadingCount::new(None);
        assert!(!unlimited.record());
        assert!(!unlimited.reached());
    }

    #[test]
    fn missing_address_is_usage_error() {
        let err = resolve_address(None, Path::new("/nonexistent/mm.json")).unwrap_err();
        assert_eq!(err.code, USAGE);
    }
}
