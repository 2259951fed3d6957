/// Errors reported synchronously by session control operations.
///
/// Conditions inside a running session are not errors here; they end the
/// session and are described by its [`StopReason`](crate::StopReason).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// `start` was called while a session is running.
    #[error("session already running")]
    AlreadyRunning,

    /// `stop` was called while no session is running.
    #[error("session not running")]
    NotRunning,

    /// No device address is configured.
    #[error("no device address configured")]
    MissingDeviceAddress,

    /// The worker thread could not be spawned.
    #[error("failed to spawn session worker: {0}")]
    Spawn(#[source] std::io::Error),

    /// The worker thread panicked.
    #[error("session worker panicked")]
    WorkerPanicked,
}

pub type Result<T> = std::result::Result<T, SessionError>;
