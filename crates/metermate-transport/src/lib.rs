//! Byte-stream transport boundary for metering device links.
//!
//! The protocol engine only needs three things from a transport: open a
//! connection to a device, read whatever bytes are available (even a single
//! one), and close. This crate defines that boundary ([`Connector`] and
//! [`ByteStream`]) and ships a socket-backed implementation:
//! - `tcp://host:port` for serial-over-TCP bridges
//! - `unix:///path/to.sock` for local bridges (Unix only)
//!
//! This is the lowest layer of metermate. Everything else builds on top of
//! the streams produced here.

pub mod address;
pub mod error;
pub mod socket;
pub mod traits;

pub use address::{DeviceAddress, ServiceId, SERIAL_PORT_PROFILE};
pub use error::{Result, TransportError};
pub use socket::{SocketConnector, SocketStream};
pub use traits::{ByteStream, Connector};
