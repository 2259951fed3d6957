use std::io::{ErrorKind, Read};

use metermate_transport::ByteStream;

use crate::codec::{Frame, FrameConfig, FrameDecoder};
use crate::error::{FrameError, Result};

/// Reads complete frames from any `Read` stream.
///
/// Each read asks the stream for a single byte, so a transport that only
/// ever delivers one unit at a time is handled the same as a bulk one.
/// Callers always get complete frames.
pub struct FrameReader<T> {
    inner: T,
    decoder: FrameDecoder,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            decoder: FrameDecoder::new(config.max_payload_size),
            config,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::EndOfStream)` when EOF is reached, even if a
    /// frame was in progress. A read timeout surfaces as `FrameError::Io`
    /// with the partial frame kept, so calling again resumes it.
    pub fn read_frame(&mut self) -> Result<Frame> {
        let mut byte = [0u8; 1];
        loop {
            let read = match self.inner.read(&mut byte) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                if self.decoder.buffered() > 0 {
                    tracing::debug!(
                        discarded = self.decoder.buffered(),
                        "stream ended mid-frame"
                    );
                }
                self.decoder.reset();
                return Err(FrameError::EndOfStream);
            }

            if let Some(frame) = self.decoder.push(byte[0])? {
                return Ok(frame);
            }
        }
    }

    /// Iterate over frames until the stream ends or fails.
    ///
    /// End of stream finishes the iterator; other errors are yielded.
    pub fn frames(&mut self) -> Frames<'_, T> {
        Frames { reader: self }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Borrow the frame state machine.
    pub fn decoder(&self) -> &FrameDecoder {
        &self.decoder
    }

    /// Update maximum payload size for subsequent frame decoding.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.config.max_payload_size = max_payload_size;
        self.decoder.set_max_payload(max_payload_size);
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl<T: ByteStream> FrameReader<T> {
    /// Create a frame reader for a device stream and apply read timeout from config.
    pub fn with_config_stream(mut inner: T, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

/// Iterator returned by [`FrameReader::frames`].
pub struct Frames<'a, T> {
    reader: &'a mut FrameReader<T>,
}

impl<T: Read> Iterator for Frames<'_, T> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_frame() {
            Ok(frame) => Some(Ok(frame)),
            Err(FrameError::EndOfStream) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

pub(crate) fn transport_to_frame_error(err: metermate_transport::TransportError) -> FrameError {
    match err {
        metermate_transport::TransportError::Io(io) => FrameError::Io(io),
        metermate_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}
