use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Start-of-frame marker.
pub const STX: u8 = 0x02;

/// End-of-frame marker.
pub const ETX: u8 = 0x03;

/// Default maximum payload size: 4 KiB.
///
/// Device frames are short JSON records; anything larger is line noise.
pub const DEFAULT_MAX_PAYLOAD: usize = 4 * 1024;

/// A complete frame payload, without its STX/ETX markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The bytes collected between the markers.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// The payload as text.
    pub fn text(&self) -> std::result::Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.payload)
    }

    /// Whether the payload is empty or only whitespace.
    pub fn is_blank(&self) -> bool {
        self.payload.iter().all(u8::is_ascii_whitespace)
    }

    /// The total wire size of this frame (markers + payload).
    pub fn wire_size(&self) -> usize {
        self.payload.len() + 2
    }
}

/// Encode a payload into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────┬──────────────────────────────┬──────────┐
/// │ STX 0x02 │ Payload (UTF-8 text,         │ ETX 0x03 │
/// │          │ no 0x02 / 0x03 inside)       │          │
/// └──────────┴──────────────────────────────┴──────────┘
/// ```
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.iter().any(|&b| b == STX || b == ETX) {
        return Err(FrameError::ControlByteInPayload);
    }
    dst.reserve(payload.len() + 2);
    dst.put_u8(STX);
    dst.put_slice(payload);
    dst.put_u8(ETX);
    Ok(())
}

/// Whether the decoder is inside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// Waiting for STX; other bytes are discarded.
    Idle,
    /// Accumulating payload bytes until ETX.
    Collecting,
}

/// Byte-at-a-time STX/ETX state machine.
///
/// ```text
/// Idle        --STX-->   Collecting([])
/// Idle        --other--> Idle                     (discarded)
/// Collecting  --STX-->   Collecting([])           (resync)
/// Collecting  --ETX-->   Idle                     (emit frame)
/// Collecting  --b-->     Collecting(buf + b)
/// ```
///
/// State survives between calls, so bytes may arrive in any chunking.
#[derive(Debug)]
pub struct FrameDecoder {
    state: DecoderState,
    buf: BytesMut,
    max_payload: usize,
}

impl FrameDecoder {
    pub fn new(max_payload: usize) -> Self {
        Self {
            state: DecoderState::Idle,
            buf: BytesMut::new(),
            max_payload,
        }
    }

    /// Feed one byte. Returns a frame when `byte` is the closing ETX.
    ///
    /// A frame that outgrows the maximum payload is dropped, the decoder
    /// returns to `Idle`, and `PayloadTooLarge` is reported once.
    pub fn push(&mut self, byte: u8) -> Result<Option<Frame>> {
        match (self.state, byte) {
            (_, STX) => {
                if self.state == DecoderState::Collecting && !self.buf.is_empty() {
                    tracing::debug!(
                        discarded = self.buf.len(),
                        "start marker inside frame; resyncing"
                    );
                }
                self.buf.clear();
                self.state = DecoderState::Collecting;
                Ok(None)
            }
            (DecoderState::Idle, _) => Ok(None),
            (DecoderState::Collecting, ETX) => {
                self.state = DecoderState::Idle;
                let payload = self.buf.split().freeze();
                Ok(Some(Frame { payload }))
            }
            (DecoderState::Collecting, b) => {
                if self.buf.len() >= self.max_payload {
                    let size = self.buf.len() + 1;
                    self.reset();
                    return Err(FrameError::PayloadTooLarge {
                        size,
                        max: self.max_payload,
                    });
                }
                self.buf.put_u8(b);
                Ok(None)
            }
        }
    }

    /// Consume bytes from `src` until a frame completes or `src` is empty.
    ///
    /// Bytes after the returned frame stay in `src`.
    pub fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        while src.has_remaining() {
            let byte = src.get_u8();
            if let Some(frame) = self.push(byte)? {
                return Ok(Some(frame));
            }
        }
        Ok(None)
    }

    /// Drop any partial frame and return to `Idle`.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.state = DecoderState::Idle;
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Number of payload bytes collected for the frame in progress.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn max_payload(&self) -> usize {
        self.max_payload
    }

    /// Update the maximum payload size for subsequent bytes.
    pub fn set_max_payload(&mut self, max_payload: usize) {
        self.max_payload = max_payload;
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAYLOAD)
    }
}

/// Configuration for the frame reader/writer.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 4 KiB.
    pub max_payload_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
