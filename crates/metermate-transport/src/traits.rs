use std::io::Read;
use std::time::Duration;

use crate::address::{DeviceAddress, ServiceId};
use crate::error::Result;

/// A connected device byte stream.
///
/// Reads follow `std::io::Read` semantics with partial reads allowed: a read
/// returns whatever is available, possibly a single byte, and `Ok(0)` means
/// the peer closed the stream.
pub trait ByteStream: Read + Send {
    /// Release the connection. Calling this more than once is harmless.
    fn close(&mut self) -> Result<()>;

    /// Bound how long a single read may block. `None` blocks indefinitely.
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()>;
}

/// Opens byte streams to devices.
pub trait Connector: Send + Sync {
    type Stream: ByteStream + 'static;

    /// Open a stream to `address` on the given service channel.
    fn connect(&self, address: &DeviceAddress, service: &ServiceId) -> Result<Self::Stream>;
}

impl<S: ByteStream + ?Sized> ByteStream for Box<S> {
    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        (**self).set_read_timeout(timeout)
    }
}
