//! Connection lifecycle and read-decode-dispatch loop for metering devices.
//!
//! A session opens the device stream, reads frames until a stop request or
//! a terminal condition, and reports every reading to a [`ReadingSink`].
//! Malformed frames are reported and skipped; transport faults and a silent
//! device end the session. There is no automatic reconnect: the operator
//! starts a new session.

pub mod board;
pub mod config;
pub mod controller;
pub mod error;
pub mod runner;
pub mod sink;
pub mod stop;

#[cfg(feature = "async")]
pub mod async_runner;

pub use board::{ReadingBoard, Slot};
pub use config::SessionConfig;
pub use controller::{SessionController, SessionState};
pub use error::{Result, SessionError};
pub use runner::{run_session, SessionOutcome, StopReason};
pub use sink::{ChannelSink, ReadingSink, SessionEvent};
pub use stop::StopToken;

#[cfg(feature = "async")]
pub use async_runner::{run_session_async, run_stream_async};
