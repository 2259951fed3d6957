use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use metermate_command::{Command, MeterStatus, Outcome};
use metermate_frame::FrameWriter;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cmd::{install_ctrlc_handler, parse_duration, EmulateArgs};
use crate::exit::{io_error, CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

const ACCEPT_POLL: Duration = Duration::from_millis(50);

pub fn run(args: EmulateArgs, format: OutputFormat) -> CliResult<i32> {
    let interval = parse_duration(&args.interval, false)?;
    let listener = TcpListener::bind(&args.bind)
        .map_err(|err| io_error(&format!("bind {} failed", args.bind), err))?;
    listener
        .set_nonblocking(true)
        .map_err(|err| io_error("listener setup failed", err))?;
    let local = listener
        .local_addr()
        .map_err(|err| io_error("listener setup failed", err))?;
    announce(local, format);

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    install_ctrlc_handler(move || flag.store(false, Ordering::SeqCst))?;

    while running.load(Ordering::SeqCst) {
        let (stream, peer) = match listener.accept() {
            Ok(accepted) => accepted,
            Err(err) if err.kind() == ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL);
                continue;
            }
            Err(err) => return Err(io_error("accept failed", err)),
        };
        info!(%peer, "monitor connected");

        let sent = serve(stream, &args, interval, &running);
        info!(%peer, sent, "monitor disconnected");

        if args.count.is_some_and(|count| sent >= count) {
            break;
        }
    }

    Ok(SUCCESS)
}

fn announce(local: SocketAddr, format: OutputFormat) {
    let address = format!("tcp://{local}");
    match format {
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct Listening<'a> {
                listening: &'a str,
            }
            print_json(&Listening {
                listening: &address,
            });
        }
        OutputFormat::Table | OutputFormat::Pretty => println!("listening on {address}"),
    }
}

/// Send frames to one monitor until it goes away, the count is reached, or
/// the emulator is interrupted. Returns the number of frames sent.
fn serve(stream: TcpStream, args: &EmulateArgs, interval: Duration, running: &AtomicBool) -> usize {
    // Accepted sockets can inherit non-blocking mode from the listener.
    if let Err(err) = stream.set_nonblocking(false) {
        warn!(error = %err, "failed to make connection blocking");
        return 0;
    }
    let _ = stream.set_nodelay(true);

    let mut writer = FrameWriter::new(stream);
    let mut sent = 0usize;
    while running.load(Ordering::SeqCst) {
        if args.count.is_some_and(|count| sent >= count) {
            break;
        }

        let record = device_record(sent, args.capitalized);
        if let Err(err) = writer.send(record.as_bytes()) {
            debug!(error = %err, "send failed");
            break;
        }
        debug!(%record, "frame sent");
        sent += 1;

        thread::sleep(interval);
    }

    let _ = writer.get_ref().shutdown(std::net::Shutdown::Both);
    sent
}

/// The record for the `seq`th frame: temperature and status alternate.
fn device_record(seq: usize, capitalized: bool) -> String {
    let step = seq / 2;
    let command = if seq % 2 == 0 {
        Command::GetTemperature(Outcome::Ready(18.0 + (step % 16) as f64 * 0.25))
    } else {
        Command::GetStatus(Outcome::Ready(MeterStatus {
            in_delivery_mode: step % 2 == 1,
            product_flowing: step % 4 == 3,
            error: false,
            in_calibration: step % 8 == 7,
        }))
    };

    let record = command.to_json();
    if capitalized {
        record
            .replace(":true", ":True")
            .replace(":false", ":False")
    } else {
        record
    }
}
