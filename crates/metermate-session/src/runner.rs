use std::io::Read;
use std::time::Duration;

use metermate_command::{decode_frame, dispatch, Reading, ReadingKind};
use metermate_frame::{Frame, FrameError, FrameReader};
use metermate_transport::{ByteStream, Connector};
use tracing::{debug, error, info, warn};

use crate::config::SessionConfig;
use crate::sink::ReadingSink;
use crate::stop::StopToken;

const NO_RESPONSE_MESSAGE: &str = "OBC not connected. Connect & restart app.";

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The stop flag was observed between frames.
    Requested,
    /// The stream ended or the device sent an empty frame.
    NoResponse,
    /// Connecting or reading failed.
    TransportFault(String),
}

impl StopReason {
    /// The message reported to the sink, if the session ended abnormally.
    pub fn connection_lost_message(&self) -> Option<&str> {
        match self {
            StopReason::Requested => None,
            StopReason::NoResponse => Some(NO_RESPONSE_MESSAGE),
            StopReason::TransportFault(message) => Some(message),
        }
    }
}

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub reason: StopReason,
    /// Frames received, including rejected ones.
    pub frames: u64,
    /// Readings delivered to the sink, not counting the final sentinels.
    pub readings: u64,
    /// Frames discarded as malformed or oversized.
    pub rejected: u64,
}

impl SessionOutcome {
    pub(crate) fn new() -> Self {
        Self {
            reason: StopReason::Requested,
            frames: 0,
            readings: 0,
            rejected: 0,
        }
    }
}

/// Run one connect-loop-disconnect session to completion (blocking).
///
/// The stream is closed on every exit path, including a panic inside the
/// sink. The sink always sees `on_session_stopped` last, preceded by the
/// unavailable sentinel for each tracked reading and, when the session ended
/// abnormally, `on_connection_lost`.
pub fn run_session<C>(
    connector: &C,
    config: &SessionConfig,
    stop: &StopToken,
    sink: &mut dyn ReadingSink,
) -> SessionOutcome
where
    C: Connector + ?Sized,
{
    let mut outcome = SessionOutcome::new();
    info!(address = %config.device_address, "session starting");

    let stream = match connector.connect(&config.device_address, &config.service_id) {
        Ok(stream) => stream,
        Err(err) => {
            error!(address = %config.device_address, error = %err, "connect failed");
            outcome.reason = StopReason::TransportFault(err.to_string());
            return finish(outcome, sink);
        }
    };

    let guard = StreamGuard::new(stream);
    let mut reader = match FrameReader::with_config_stream(guard, config.frame_config()) {
        Ok(reader) => reader,
        Err(err) => {
            error!(error = %err, "failed to configure device stream");
            outcome.reason = StopReason::TransportFault(err.to_string());
            return finish(outcome, sink);
        }
    };

    let reason = read_loop(&mut reader, stop, sink, &mut outcome);
    outcome.reason = reason;

    let mut guard = reader.into_inner();
    if let Err(err) = guard.close() {
        warn!(error = %err, "error closing device stream");
    }

    finish(outcome, sink)
}

fn read_loop<R: Read>(
    reader: &mut FrameReader<R>,
    stop: &StopToken,
    sink: &mut dyn ReadingSink,
    outcome: &mut SessionOutcome,
) -> StopReason {
    loop {
        if stop.is_stop_requested() {
            debug!("stop requested");
            return StopReason::Requested;
        }

        match reader.read_frame() {
            Ok(frame) => {
                if let Some(reason) = handle_frame(&frame, sink, outcome) {
                    return reason;
                }
                std::thread::yield_now();
            }
            Err(err) => {
                if let Some(reason) = handle_read_error(err, sink, outcome) {
                    return reason;
                }
            }
        }
    }
}

/// Decode and dispatch one frame. Returns a reason when the frame ends the
/// session.
pub(crate) fn handle_frame(
    frame: &Frame,
    sink: &mut dyn ReadingSink,
    outcome: &mut SessionOutcome,
) -> Option<StopReason> {
    outcome.frames += 1;
    if let Ok(text) = frame.text() {
        debug!(text, "frame received");
    }

    let command = match decode_frame(frame) {
        Ok(command) => command,
        Err(err) if err.is_no_response() => {
            warn!("empty frame from device");
            return Some(StopReason::NoResponse);
        }
        Err(err) => {
            reject(sink, outcome, &err.to_string());
            return None;
        }
    };

    debug!(command = command.name(), result = command.result_code(), "command received");
    if let Some(reading) = dispatch(&command) {
        outcome.readings += 1;
        sink.on_reading(reading);
    }
    None
}

/// Classify a frame read error. Returns a reason when it ends the session.
pub(crate) fn handle_read_error(
    err: FrameError,
    sink: &mut dyn ReadingSink,
    outcome: &mut SessionOutcome,
) -> Option<StopReason> {
    match err {
        err if err.is_timeout() => None,
        FrameError::PayloadTooLarge { .. } => {
            outcome.frames += 1;
            reject(sink, outcome, &err.to_string());
            None
        }
        FrameError::EndOfStream => {
            warn!("device stream ended");
            Some(StopReason::NoResponse)
        }
        other => {
            error!(error = %other, "device stream failed");
            Some(StopReason::TransportFault(other.to_string()))
        }
    }
}

fn reject(sink: &mut dyn ReadingSink, outcome: &mut SessionOutcome, reason: &str) {
    outcome.rejected += 1;
    warn!(reason, "discarding malformed frame");
    sink.on_frame_rejected(reason);
}

/// Report the end of a session to the sink.
pub(crate) fn finish(outcome: SessionOutcome, sink: &mut dyn ReadingSink) -> SessionOutcome {
    if let Some(message) = outcome.reason.connection_lost_message() {
        sink.on_connection_lost(message);
    }
    for kind in [ReadingKind::Temperature, ReadingKind::Status] {
        sink.on_reading(Reading::unavailable(kind));
    }
    sink.on_session_stopped();

    info!(
        reason = ?outcome.reason,
        frames = outcome.frames,
        readings = outcome.readings,
        rejected = outcome.rejected,
        "session stopped"
    );
    outcome
}

/// Owns the device stream for one session and closes it when dropped.
struct StreamGuard<S: ByteStream> {
    stream: S,
}

impl<S: ByteStream> StreamGuard<S> {
    fn new(stream: S) -> Self {
        Self { stream }
    }
}

impl<S: ByteStream> Read for StreamGuard<S> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.stream.read(buf)
    }
}

impl<S: ByteStream> ByteStream for StreamGuard<S> {
    fn close(&mut self) -> metermate_transport::Result<()> {
        self.stream.close()
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> metermate_transport::Result<()> {
        self.stream.set_read_timeout(timeout)
    }
}

impl<S: ByteStream> Drop for StreamGuard<S> {
    fn drop(&mut self) {
        // Idempotent; after an explicit close this is a no-op.
        let _ = self.stream.close();
    }
}
