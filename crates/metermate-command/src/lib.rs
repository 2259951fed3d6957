//! Command decoding and reading dispatch for metering device frames.
//!
//! A frame payload is a JSON record with at least a `Command` discriminator
//! and an integer `Result` code. Decoding turns it into a typed [`Command`];
//! dispatching turns a command into the [`Reading`] shown to the operator.

pub mod command;
pub mod decode;
pub mod dispatch;
pub mod error;
pub mod reading;

pub use command::{Command, CommandKind, MeterStatus, Outcome, GET_STATUS, GET_TEMPERATURE};
pub use decode::{decode, decode_frame, normalize_literals};
pub use dispatch::{decode_and_dispatch, dispatch};
pub use error::{DecodeError, Result};
pub use reading::{Celsius, Reading, ReadingKind};
