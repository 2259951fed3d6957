//! Session loop on tokio.
//!
//! Same decode, dispatch and reporting as [`run_session`](crate::run_session),
//! with a [`CancellationToken`] in place of the stop flag. Cancellation is
//! honoured between frames and while waiting for the next frame to start; a
//! frame that has begun arriving is read to completion first.

use std::io;
use std::time::Duration;

use metermate_frame::{DecoderState, FrameDecoder, FrameError};
use metermate_transport::TransportError;
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::SessionConfig;
use crate::runner::{finish, handle_frame, handle_read_error, SessionOutcome, StopReason};
use crate::sink::ReadingSink;

/// Connect to `config.device_address` and run a session until it ends.
///
/// Supports `tcp://host:port` and, on unix, `unix:///path`.
pub async fn run_session_async(
    config: &SessionConfig,
    cancel: &CancellationToken,
    sink: &mut dyn ReadingSink,
) -> SessionOutcome {
    info!(address = %config.device_address, "session starting");
    let address = config.device_address.as_str();

    if let Some(target) = address.strip_prefix("tcp://") {
        if !target.is_empty() {
            let connect = tokio::net::TcpStream::connect(target);
            return match connect_or_cancel(connect, cancel).await {
                Connected::Stream(Ok(stream)) => {
                    if let Err(err) = stream.set_nodelay(true) {
                        debug!(error = %err, "failed to set TCP_NODELAY");
                    }
                    run_stream_async(stream, config, cancel, sink).await
                }
                Connected::Stream(Err(source)) => connect_failed(config, source, sink),
                Connected::Cancelled => finish(SessionOutcome::new(), sink),
            };
        }
    }

    #[cfg(unix)]
    if let Some(target) = address.strip_prefix("unix://") {
        if !target.is_empty() {
            let connect = tokio::net::UnixStream::connect(target);
            return match connect_or_cancel(connect, cancel).await {
                Connected::Stream(Ok(stream)) => run_stream_async(stream, config, cancel, sink).await,
                Connected::Stream(Err(source)) => connect_failed(config, source, sink),
                Connected::Cancelled => finish(SessionOutcome::new(), sink),
            };
        }
    }

    let err = if matches!(address, "tcp://" | "unix://") {
        TransportError::InvalidAddress {
            address: address.to_string(),
            reason: "missing connect target".to_string(),
        }
    } else {
        TransportError::Unsupported(address.to_string())
    };
    error!(address, error = %err, "connect failed");
    let mut outcome = SessionOutcome::new();
    outcome.reason = StopReason::TransportFault(err.to_string());
    finish(outcome, sink)
}

enum Connected<S> {
    Stream(io::Result<S>),
    Cancelled,
}

async fn connect_or_cancel<F, S>(connect: F, cancel: &CancellationToken) -> Connected<S>
where
    F: std::future::Future<Output = io::Result<S>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Connected::Cancelled,
        result = connect => Connected::Stream(result),
    }
}

fn connect_failed(
    config: &SessionConfig,
    source: io::Error,
    sink: &mut dyn ReadingSink,
) -> SessionOutcome {
    let err = TransportError::Connect {
        address: config.device_address.to_string(),
        source,
    };
    error!(address = %config.device_address, error = %err, "connect failed");
    let mut outcome = SessionOutcome::new();
    outcome.reason = StopReason::TransportFault(err.to_string());
    finish(outcome, sink)
}

/// Run a session over an already open stream. The stream is dropped, and
/// so closed, before this returns.
pub async fn run_stream_async<R>(
    stream: R,
    config: &SessionConfig,
    cancel: &CancellationToken,
    sink: &mut dyn ReadingSink,
) -> SessionOutcome
where
    R: AsyncRead + Unpin,
{
    let mut outcome = SessionOutcome::new();
    let mut reader = BufReader::new(stream);
    let mut decoder = FrameDecoder::new(config.max_frame_size);
    let timeout = config.read_timeout();

    let reason = loop {
        if cancel.is_cancelled() {
            debug!("session cancelled");
            break StopReason::Requested;
        }

        let next = if decoder.state() == DecoderState::Idle {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("session cancelled");
                    break StopReason::Requested;
                }
                result = read_byte(&mut reader, timeout) => result,
            }
        } else {
            read_byte(&mut reader, timeout).await
        };

        let pushed = match next {
            Ok(byte) => decoder.push(byte),
            Err(err) => {
                if matches!(err, FrameError::EndOfStream) {
                    decoder.reset();
                }
                Err(err)
            }
        };

        match pushed {
            Ok(Some(frame)) => {
                if let Some(reason) = handle_frame(&frame, sink, &mut outcome) {
                    break reason;
                }
                tokio::task::yield_now().await;
            }
            Ok(None) => {}
            Err(err) => {
                if let Some(reason) = handle_read_error(err, sink, &mut outcome) {
                    break reason;
                }
            }
        }
    };
    outcome.reason = reason;

    drop(reader);
    finish(outcome, sink)
}

async fn read_byte<R>(reader: &mut BufReader<R>, timeout: Option<Duration>) -> metermate_frame::Result<u8>
where
    R: AsyncRead + Unpin,
{
    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, reader.read_u8()).await {
            Ok(result) => result,
            Err(_) => return Err(FrameError::Io(io::Error::from(io::ErrorKind::TimedOut))),
        },
        None => reader.read_u8().await,
    };
    result.map_err(|err| match err.kind() {
        io::ErrorKind::UnexpectedEof => FrameError::EndOfStream,
        _ => FrameError::Io(err),
    })
}
