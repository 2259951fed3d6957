use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use metermate_command::Reading;
use metermate_transport::Connector;
use tracing::debug;

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::runner::{run_session, SessionOutcome};
use crate::sink::ReadingSink;
use crate::stop::StopToken;

/// Externally visible session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Stopped,
    Running,
}

struct Shared {
    running: AtomicBool,
    stop: StopToken,
}

/// Clears the running flag when the worker exits, even by panic.
struct RunningGuard(Arc<Shared>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.running.store(false, Ordering::SeqCst);
    }
}

/// Forwards to the caller's sink, leaving `Running` before the stopped event
/// is delivered.
struct WorkerSink<S> {
    inner: S,
    shared: Arc<Shared>,
}

impl<S: ReadingSink> ReadingSink for WorkerSink<S> {
    fn on_reading(&mut self, reading: Reading) {
        self.inner.on_reading(reading);
    }

    fn on_frame_rejected(&mut self, reason: &str) {
        self.inner.on_frame_rejected(reason);
    }

    fn on_connection_lost(&mut self, message: &str) {
        self.inner.on_connection_lost(message);
    }

    fn on_session_stopped(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        self.inner.on_session_stopped();
    }
}

/// Runs sessions on a dedicated worker thread.
///
/// At most one session runs at a time. `stop` only sets the cooperative
/// flag; the worker observes it before its next frame read, so a stop can
/// wait for one frame (or read timeout) to arrive.
pub struct SessionController<C: Connector + 'static> {
    connector: Arc<C>,
    config: SessionConfig,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<SessionOutcome>>,
}

impl<C: Connector + 'static> SessionController<C> {
    pub fn new(connector: C, config: SessionConfig) -> Self {
        Self {
            connector: Arc::new(connector),
            config,
            shared: Arc::new(Shared {
                running: AtomicBool::new(false),
                stop: StopToken::new(),
            }),
            worker: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Replace the configuration used by the next `start`.
    pub fn set_config(&mut self, config: SessionConfig) {
        self.config = config;
    }

    pub fn state(&self) -> SessionState {
        if self.shared.running.load(Ordering::SeqCst) {
            SessionState::Running
        } else {
            SessionState::Stopped
        }
    }

    /// Start a session that reports to `sink`.
    pub fn start<S>(&mut self, sink: S) -> Result<()>
    where
        S: ReadingSink + 'static,
    {
        if self.state() == SessionState::Running {
            return Err(SessionError::AlreadyRunning);
        }
        if self.config.device_address.is_blank() {
            return Err(SessionError::MissingDeviceAddress);
        }

        // Reap the previous, already finished worker.
        if let Some(previous) = self.worker.take() {
            let _ = previous.join();
        }

        self.shared.stop.reset();
        self.shared.running.store(true, Ordering::SeqCst);

        let shared = Arc::clone(&self.shared);
        let connector = Arc::clone(&self.connector);
        let config = self.config.clone();
        let spawned = std::thread::Builder::new()
            .name("metermate-session".to_string())
            .spawn(move || {
                let _running = RunningGuard(Arc::clone(&shared));
                let mut sink = WorkerSink {
                    inner: sink,
                    shared: Arc::clone(&shared),
                };
                run_session(connector.as_ref(), &config, &shared.stop, &mut sink)
            });

        match spawned {
            Ok(handle) => {
                debug!(address = %self.config.device_address, "session worker started");
                self.worker = Some(handle);
                Ok(())
            }
            Err(err) => {
                self.shared.running.store(false, Ordering::SeqCst);
                Err(SessionError::Spawn(err))
            }
        }
    }

    /// Ask the running session to stop before its next frame.
    pub fn stop(&self) -> Result<()> {
        if self.state() != SessionState::Running {
            return Err(SessionError::NotRunning);
        }
        self.shared.stop.request_stop();
        Ok(())
    }

    /// A handle that can request a stop from another thread.
    pub fn stop_token(&self) -> StopToken {
        self.shared.stop.clone()
    }

    /// Wait for the current worker to finish.
    ///
    /// Returns `Ok(None)` when no session was started since the last join.
    pub fn join(&mut self) -> Result<Option<SessionOutcome>> {
        match self.worker.take() {
            None => Ok(None),
            Some(handle) => handle
                .join()
                .map(Some)
                .map_err(|_| SessionError::WorkerPanicked),
        }
    }
}

impl<C: Connector + 'static> Drop for SessionController<C> {
    fn drop(&mut self) {
        // The worker may be blocked in a read; do not wait for it.
        self.shared.stop.request_stop();
    }
}
