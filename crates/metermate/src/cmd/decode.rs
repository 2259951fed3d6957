use std::io::Cursor;

use metermate_command::{decode, decode_frame, dispatch};
use metermate_frame::FrameReader;

use crate::cmd::DecodeArgs;
use crate::exit::{decode_error, frame_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{print_decoded, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    if !args.hex {
        let command = decode(&args.text).map_err(|err| decode_error("decode failed", err))?;
        print_decoded(&command, dispatch(&command).as_ref(), format);
        return Ok(SUCCESS);
    }

    let bytes = parse_hex(&args.text)?;
    let mut reader = FrameReader::new(Cursor::new(bytes));
    let mut decoded = 0usize;
    for frame in reader.frames() {
        let frame = frame.map_err(|err| frame_error("frame read failed", err))?;
        let command = decode_frame(&frame).map_err(|err| decode_error("decode failed", err))?;
        print_decoded(&command, dispatch(&command).as_ref(), format);
        decoded += 1;
    }

    if decoded == 0 {
        return Err(CliError::new(
            DATA_INVALID,
            "no complete STX/ETX frame in input",
        ));
    }
    Ok(SUCCESS)
}

/// Parse hex bytes, ignoring whitespace, `:`/`,` separators and `0x` prefixes.
fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let digits: String = input
        .split(|c: char| c.is_whitespace() || c == ':' || c == ',')
        .map(|token| {
            token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token)
        })
        .collect();

    hex::decode(&digits).map_err(|err| CliError::new(USAGE, format!("invalid hex input: {err}")))
}
