//! Protocol engine for serial-linked metering devices.
//!
//! A device sends STX/ETX framed JSON command records over a byte stream.
//! metermate reads the frames, decodes the records, turns them into
//! temperature and status readings, and runs the connect/read/stop session
//! around them.
//!
//! # Crate Structure
//!
//! - [`transport`]: device addresses and the byte stream boundary (TCP, Unix sockets)
//! - [`frame`]: STX/ETX framing, blocking reader/writer and optional tokio codec
//! - [`command`]: command record decoding and dispatch to readings
//! - [`session`]: session loop, controller thread and reading sinks

/// Re-export transport types.
pub mod transport {
    pub use metermate_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use metermate_frame::*;
}

/// Re-export command types.
pub mod command {
    pub use metermate_command::*;
}

/// Re-export session types.
pub mod session {
    pub use metermate_session::*;
}
