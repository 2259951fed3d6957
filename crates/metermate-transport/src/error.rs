/// Errors that can occur in device transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to connect to the device.
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        source: std::io::Error,
    },

    /// The device address could not be parsed by this connector.
    #[error("invalid device address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// The address names a transport this connector does not provide.
    #[error("unsupported transport for address '{0}'")]
    Unsupported(String),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
