/// Errors that can occur while decoding a frame into a command.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The frame carried no text at all.
    #[error("empty frame")]
    EmptyFrame,

    /// The frame payload is not valid UTF-8.
    #[error("frame payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// The payload is not a well-formed record of the expected shape.
    #[error("malformed command record: {0}")]
    Json(#[from] serde_json::Error),

    /// A required field holds a value of the wrong kind.
    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl DecodeError {
    /// Whether the frame carried nothing, which the session reads as the
    /// device not responding rather than as line noise.
    pub fn is_no_response(&self) -> bool {
        matches!(self, DecodeError::EmptyFrame)
    }
}

pub type Result<T> = std::result::Result<T, DecodeError>;
