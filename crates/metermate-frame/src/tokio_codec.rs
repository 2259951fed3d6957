use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{encode_frame, Frame, FrameDecoder, DEFAULT_MAX_PAYLOAD};
use crate::error::FrameError;

/// `tokio_util` codec over the STX/ETX state machine.
///
/// End of stream with a frame in progress is reported as
/// `FrameError::EndOfStream` instead of a truncated frame.
#[derive(Debug)]
pub struct StxEtxCodec {
    decoder: FrameDecoder,
}

impl StxEtxCodec {
    pub fn new(max_payload: usize) -> Self {
        Self {
            decoder: FrameDecoder::new(max_payload),
        }
    }
}

impl Default for StxEtxCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAYLOAD)
    }
}

impl Decoder for StxEtxCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        self.decoder.decode(src)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        if let Some(frame) = self.decoder.decode(src)? {
            return Ok(Some(frame));
        }
        if self.decoder.buffered() > 0 {
            self.decoder.reset();
            return Err(FrameError::EndOfStream);
        }
        self.decoder.reset();
        Ok(None)
    }
}

impl Encoder<&[u8]> for StxEtxCodec {
    type Error = FrameError;

    fn encode(&mut self, payload: &[u8], dst: &mut BytesMut) -> Result<(), FrameError> {
        if payload.len() > self.decoder.max_payload() {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: self.decoder.max_payload(),
            });
        }
        encode_frame(payload, dst)
    }
}
