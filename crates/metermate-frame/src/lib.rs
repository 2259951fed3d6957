//! STX/ETX delimited framing for metering device byte streams.
//!
//! Every message on the wire is framed as:
//! - a start marker `0x02` (STX)
//! - a UTF-8 text payload that never contains `0x02` or `0x03`
//! - an end marker `0x03` (ETX)
//!
//! Bytes outside a frame are discarded, and a stray STX inside a frame
//! restarts collection. Callers always get complete frames.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod tokio_codec;

pub use codec::{
    encode_frame, DecoderState, Frame, FrameConfig, FrameDecoder, DEFAULT_MAX_PAYLOAD, ETX, STX,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;

#[cfg(feature = "async")]
pub use tokio_codec::StxEtxCodec;
