//! End-to-end sessions against a device emulated on a local TCP socket.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{mpsc, Mutex};
use std::thread;
use std::time::Duration;

use metermate_command::{Celsius, MeterStatus, Reading};
use metermate_session::{
    ChannelSink, ReadingBoard, SessionConfig, SessionController, SessionError, SessionEvent,
    SessionState, StopReason,
};
use metermate_transport::{
    ByteStream, Connector, DeviceAddress, ServiceId, SocketConnector, SocketStream,
};

const TEMPERATURE: &[u8] = b"\x02{\"Command\":\"gt\",\"Result\":0,\"Temp\":22.5}\x03";
const STATUS: &[u8] = b"\x02{\"Command\":\"gs\",\"Result\":0,\"InDeliveryMode\":True,\"ProductFlowing\":False,\"Error\":False,\"InCalibration\":True}\x03";

/// Accepts one connection and hands it to the test.
fn device() -> (String, mpsc::Receiver<TcpStream>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = format!("tcp://{}", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        if let Ok((socket, _)) = listener.accept() {
            let _ = tx.send(socket);
        }
    });
    (address, rx)
}

fn accept(rx: &mpsc::Receiver<TcpStream>) -> TcpStream {
    rx.recv_timeout(Duration::from_secs(5))
        .expect("session should connect")
}

fn next_event(rx: &mpsc::Receiver<SessionEvent>) -> SessionEvent {
    rx.recv_timeout(Duration::from_secs(5))
        .expect("session event should arrive")
}

fn start(address: &str) -> (SessionController<SocketConnector>, mpsc::Receiver<SessionEvent>) {
    let mut controller =
        SessionController::new(SocketConnector::new(), SessionConfig::new(address));
    let (sink, events) = ChannelSink::new();
    controller.start(sink).unwrap();
    (controller, events)
}

/// Socket stream that reports how many bytes it had delivered each time a
/// read starts.
struct TappedStream {
    inner: SocketStream,
    delivered: usize,
    tap: mpsc::Sender<usize>,
}

impl Read for TappedStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let _ = self.tap.send(self.delivered);
        let n = self.inner.read(buf)?;
        self.delivered += n;
        Ok(n)
    }
}

impl ByteStream for TappedStream {
    fn close(&mut self) -> metermate_transport::Result<()> {
        self.inner.close()
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> metermate_transport::Result<()> {
        self.inner.set_read_timeout(timeout)
    }
}

struct TappedConnector {
    inner: SocketConnector,
    tap: Mutex<mpsc::Sender<usize>>,
}

impl Connector for TappedConnector {
    type Stream = TappedStream;

    fn connect(
        &self,
        address: &DeviceAddress,
        service: &ServiceId,
    ) -> metermate_transport::Result<TappedStream> {
        let tap = self
            .tap
            .lock()
            .map_err(|_| std::io::Error::other("tap poisoned"))?
            .clone();
        Ok(TappedStream {
            inner: self.inner.connect(address, service)?,
            delivered: 0,
            tap,
        })
    }
}

/// Waits until the peer closes its end.
fn assert_closed_by_peer(socket: &mut TcpStream) {
    socket
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let mut buf = [0u8; 16];
    assert_eq!(socket.read(&mut buf).unwrap(), 0);
}

#[test]
fn stop_while_blocked_delivers_in_flight_frame() {
    let (address, sockets) = device();
    let (tap_tx, tap) = mpsc::channel();
    let connector = TappedConnector {
        inner: SocketConnector::new(),
        tap: Mutex::new(tap_tx),
    };
    let mut controller = SessionController::new(connector, SessionConfig::new(address.as_str()));
    let (sink, events) = ChannelSink::new();
    controller.start(sink).unwrap();
    let mut socket = accept(&sockets);
    let mut board = ReadingBoard::new();

    socket.write_all(TEMPERATURE).unwrap();
    let event = next_event(&events);
    board.apply_event(&event);
    assert_eq!(event, SessionEvent::Reading(Reading::Temperature(Celsius(22.5))));

    // Wait for the read that follows the whole temperature frame.
    loop {
        let delivered = tap
            .recv_timeout(Duration::from_secs(5))
            .expect("session should keep reading");
        if delivered >= TEMPERATURE.len() {
            break;
        }
    }

    // The worker is blocked waiting for the next frame.
    controller.stop().unwrap();
    socket.write_all(STATUS).unwrap();

    let mut tail = Vec::new();
    loop {
        let event = next_event(&events);
        board.apply_event(&event);
        let done = event == SessionEvent::Stopped;
        tail.push(event);
        if done {
            break;
        }
    }

    assert_eq!(
        tail,
        vec![
            SessionEvent::Reading(Reading::Status(MeterStatus {
                in_delivery_mode: true,
                product_flowing: false,
                error: false,
                in_calibration: true,
            })),
            SessionEvent::Reading(Reading::TemperatureUnavailable),
            SessionEvent::Reading(Reading::StatusUnavailable),
            SessionEvent::Stopped,
        ]
    );
    assert!(board.is_all_unavailable());

    let outcome = controller.join().unwrap().unwrap();
    assert_eq!(outcome.reason, StopReason::Requested);
    assert_eq!(outcome.readings, 2);
    assert_eq!(controller.state(), SessionState::Stopped);
    assert_closed_by_peer(&mut socket);
}

#[test]
fn device_hangup_ends_session() {
    let (address, sockets) = device();
    let (mut controller, events) = start(&address);
    let mut socket = accept(&sockets);

    socket.write_all(b"\x02not json\x03").unwrap();
    socket.write_all(TEMPERATURE).unwrap();
    drop(socket);

    assert!(matches!(next_event(&events), SessionEvent::FrameRejected(_)));
    assert!(matches!(next_event(&events), SessionEvent::Reading(Reading::Temperature(_))));
    assert!(matches!(next_event(&events), SessionEvent::ConnectionLost(_)));

    let outcome = controller.join().unwrap().unwrap();
    assert_eq!(outcome.reason, StopReason::NoResponse);
    assert_eq!(outcome.frames, 2);
    assert_eq!(outcome.rejected, 1);
}

#[test]
fn empty_frame_means_device_not_responding() {
    let (address, sockets) = device();
    let (mut controller, events) = start(&address);
    let mut socket = accept(&sockets);

    socket.write_all(b"\x02\x03").unwrap();

    match next_event(&events) {
        SessionEvent::ConnectionLost(message) => assert!(message.contains("restart app")),
        other => panic!("unexpected event: {other:?}"),
    }
    let outcome = controller.join().unwrap().unwrap();
    assert_eq!(outcome.reason, StopReason::NoResponse);
    assert_closed_by_peer(&mut socket);
}

#[test]
fn refused_connection_reports_and_stops() {
    // Bind then drop to get a port nothing listens on.
    let port = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let (mut controller, events) = start(&format!("tcp://127.0.0.1:{port}"));

    assert!(matches!(next_event(&events), SessionEvent::ConnectionLost(_)));
    let outcome = controller.join().unwrap().unwrap();
    assert!(matches!(outcome.reason, StopReason::TransportFault(_)));
    assert!(matches!(controller.stop(), Err(SessionError::NotRunning)));
}

#[test]
fn read_timeout_keeps_session_stoppable() {
    let (address, sockets) = device();
    let config = SessionConfig::new(address.as_str()).with_read_timeout(Duration::from_millis(25));
    let mut controller = SessionController::new(SocketConnector::new(), config);
    let (sink, events) = ChannelSink::new();
    controller.start(sink).unwrap();
    let _socket = accept(&sockets);

    // Nothing is sent; the timeout lets the worker see the stop flag.
    controller.stop().unwrap();
    let outcome = controller.join().unwrap().unwrap();
    assert_eq!(outcome.reason, StopReason::Requested);
    assert_eq!(events.try_iter().last(), Some(SessionEvent::Stopped));
}
