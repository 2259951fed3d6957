use std::sync::mpsc;

use metermate_command::Reading;

/// Presentation-side callbacks driven by a session.
///
/// The session calls into the sink from its own flow of control; it never
/// reads presentation state back.
pub trait ReadingSink: Send {
    /// A command produced a reading.
    fn on_reading(&mut self, reading: Reading);

    /// A frame was discarded as malformed. The session keeps running.
    fn on_frame_rejected(&mut self, _reason: &str) {}

    /// The device stopped responding or the transport failed.
    fn on_connection_lost(&mut self, message: &str);

    /// The session reached `Stopped`. Always the last callback of a session.
    fn on_session_stopped(&mut self);
}

/// A sink callback as a value.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Reading(Reading),
    FrameRejected(String),
    ConnectionLost(String),
    Stopped,
}

/// Forwards callbacks over a channel to another thread.
///
/// Send failures are ignored: a dropped receiver means nobody is watching.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<SessionEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::Receiver<SessionEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }

    pub fn from_sender(tx: mpsc::Sender<SessionEvent>) -> Self {
        Self { tx }
    }

    fn forward(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }
}

impl ReadingSink for ChannelSink {
    fn on_reading(&mut self, reading: Reading) {
        self.forward(SessionEvent::Reading(reading));
    }

    fn on_frame_rejected(&mut self, reason: &str) {
        self.forward(SessionEvent::FrameRejected(reason.to_string()));
    }

    fn on_connection_lost(&mut self, message: &str) {
        self.forward(SessionEvent::ConnectionLost(message.to_string()));
    }

    fn on_session_stopped(&mut self) {
        self.forward(SessionEvent::Stopped);
    }
}

/// Records every callback in order.
impl ReadingSink for Vec<SessionEvent> {
    fn on_reading(&mut self, reading: Reading) {
        self.push(SessionEvent::Reading(reading));
    }

    fn on_frame_rejected(&mut self, reason: &str) {
        self.push(SessionEvent::FrameRejected(reason.to_string()));
    }

    fn on_connection_lost(&mut self, message: &str) {
        self.push(SessionEvent::ConnectionLost(message.to_string()));
    }

    fn on_session_stopped(&mut self) {
        self.push(SessionEvent::Stopped);
    }
}

#[cfg(test)]
mod tests {
    use metermate_command::Celsius;

    use super::*;

    #[test]
    fn channel_sink_forwards_in_order() {
        let (mut sink, rx) = ChannelSink::new();
        sink.on_reading(Reading::Temperature(Celsius(20.0)));
        sink.on_frame_rejected("bad");
        sink.on_connection_lost("gone");
        sink.on_session_stopped();

        let events: Vec<SessionEvent> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                SessionEvent::Reading(Reading::Temperature(Celsius(20.0))),
                SessionEvent::FrameRejected("bad".to_string()),
                SessionEvent::ConnectionLost("gone".to_string()),
                SessionEvent::Stopped,
            ]
        );
    }

    #[test]
    fn channel_sink_tolerates_dropped_receiver() {
        let (mut sink, rx) = ChannelSink::new();
        drop(rx);
        sink.on_session_stopped();
    }
}
