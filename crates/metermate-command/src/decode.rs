use std::borrow::Cow;

use metermate_frame::Frame;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Number, Value};

use crate::command::{Command, CommandKind, MeterStatus, Outcome};
use crate::error::{DecodeError, Result};

/// Rewrite capitalized boolean literals to JSON's lowercase spelling.
///
/// Device firmware emits `True`/`False`. The substitution is purely textual
/// and case-sensitive, matching how the firmware encodes its records.
pub fn normalize_literals(text: &str) -> Cow<'_, str> {
    if !text.contains("True") && !text.contains("False") {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.replace("False", "false").replace("True", "true"))
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "Command")]
    command: String,
    #[serde(rename = "Result")]
    result: Number,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TemperatureFields {
    #[serde(rename = "Temp")]
    temp: f64,
}

/// Decode a frame's text payload into a command.
///
/// `Command` and `Result` are required for every record. Command-specific
/// fields are required only when `Result == 0`. Text ahead of the opening
/// brace (some firmware echoes the mnemonic there) is skipped.
pub fn decode(text: &str) -> Result<Command> {
    if text.trim().is_empty() {
        return Err(DecodeError::EmptyFrame);
    }

    let normalized = normalize_literals(text);
    let record = match normalized.find('{') {
        Some(0) | None => normalized.as_ref(),
        Some(start) => {
            tracing::trace!(prefix = &normalized[..start], "skipping text before record");
            &normalized[start..]
        }
    };

    let envelope: Envelope = serde_json::from_str(record)?;
    let result = result_code(&envelope.result)?;

    let command = match CommandKind::from_discriminator(&envelope.command) {
        Some(CommandKind::GetTemperature) => Command::GetTemperature(outcome(
            result,
            envelope.fields,
            |fields: TemperatureFields| fields.temp,
        )?),
        Some(CommandKind::GetStatus) => Command::GetStatus(outcome(
            result,
            envelope.fields,
            |status: MeterStatus| status,
        )?),
        None => Command::Unrecognized {
            name: envelope.command,
            result,
        },
    };

    Ok(command)
}

/// Decode a frame's payload into a command.
pub fn decode_frame(frame: &Frame) -> Result<Command> {
    if frame.is_blank() {
        return Err(DecodeError::EmptyFrame);
    }
    decode(frame.text()?)
}

fn result_code(number: &Number) -> Result<i32> {
    number
        .as_i64()
        .and_then(|code| i32::try_from(code).ok())
        .ok_or_else(|| DecodeError::InvalidField {
            field: "Result",
            reason: format!("expected a 32-bit integer, got {number}"),
        })
}

fn outcome<F, T, X>(result: i32, fields: Map<String, Value>, extract: X) -> Result<Outcome<T>>
where
    F: DeserializeOwned,
    X: FnOnce(F) -> T,
{
    if result != 0 {
        return Ok(Outcome::Unavailable { code: result });
    }
    let typed: F = serde_json::from_value(Value::Object(fields))?;
    Ok(Outcome::Ready(extract(typed)))
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[test]
    fn normalize_rewrites_capitalized_literals() {
        assert_eq!(
            normalize_literals(r#"{"a":True,"b":False}"#),
            r#"{"a":true,"b":false}"#
        );
        assert!(matches!(
            normalize_literals(r#"{"a":true}"#),
            Cow::Borrowed(_)
        ));
        // Case-sensitive: other spellings are left alone.
        assert_eq!(normalize_literals("TRUE false"), "TRUE false");
    }

    #[test]
    fn decode_temperature() {
        let command = decode(r#"{"Command":"gt","Result":0,"Temp":22.5}"#).unwrap();
        assert_eq!(command, Command::GetTemperature(Outcome::Ready(22.5)));
    }

    #[test]
    fn decode_integer_temperature() {
        let command = decode(r#"{"Command":"gt","Result":0,"Temp":-4}"#).unwrap();
        assert_eq!(command, Command::GetTemperature(Outcome::Ready(-4.0)));
    }

    #[test]
    fn decode_status_with_capitalized_literals() {
        let command = decode(
            r#"{"Command":"gs","Result":0,"InDeliveryMode":True,"ProductFlowing":False,"Error":False,"InCalibration":False}"#,
        )
        .unwrap();
        assert_eq!(
            command,
            Command::GetStatus(Outcome::Ready(MeterStatus {
                in_delivery_mode: true,
                product_flowing: false,
                error: false,
                in_calibration: false,
            }))
        );
    }

    #[test]
    fn decode_discriminator_case_insensitive() {
        let command = decode(r#"{"Command":"GT","Result":0,"Temp":1.0}"#).unwrap();
        assert_eq!(command, Command::GetTemperature(Outcome::Ready(1.0)));
    }

    #[test]
    fn nonzero_result_ignores_payload_fields() {
        let command = decode(r#"{"Command":"gt","Result":1,"Temp":0}"#).unwrap();
        assert_eq!(
            command,
            Command::GetTemperature(Outcome::Unavailable { code: 1 })
        );

        let command = decode(r#"{"Command":"gs","Result":2}"#).unwrap();
        assert_eq!(command, Command::GetStatus(Outcome::Unavailable { code: 2 }));
    }

    #[test]
    fn unrecognized_discriminator_is_kept() {
        let command = decode(r#"{"Command":"xx","Result":0,"Extra":[1,2]}"#).unwrap();
        assert_eq!(
            command,
            Command::Unrecognized {
                name: "xx".to_string(),
                result: 0
            }
        );
    }

    #[test]
    fn mnemonic_prefix_is_skipped() {
        let command = decode(r#"gt{"Command":"gt","Result":0,"Temp":22.5}"#).unwrap();
        assert_eq!(command, Command::GetTemperature(Outcome::Ready(22.5)));
    }

    #[test]
    fn empty_and_blank_text_rejected() {
        assert!(decode("").unwrap_err().is_no_response());
        assert!(decode(" \r\n\t").unwrap_err().is_no_response());
        assert!(decode_frame(&Frame::new(Bytes::new()))
            .unwrap_err()
            .is_no_response());
    }

    #[test]
    fn malformed_json_rejected() {
        let err = decode(r#"{"Command":"gt","Result":0,"Temp":"#).unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
        assert!(!err.is_no_response());

        let err = decode("not a record").unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }

    #[test]
    fn missing_required_fields_rejected() {
        assert!(matches!(
            decode(r#"{"Result":0}"#).unwrap_err(),
            DecodeError::Json(_)
        ));
        assert!(matches!(
            decode(r#"{"Command":"gt"}"#).unwrap_err(),
            DecodeError::Json(_)
        ));
        assert!(matches!(
            decode(r#"{"Command":"gt","Result":0}"#).unwrap_err(),
            DecodeError::Json(_)
        ));
        assert!(matches!(
            decode(r#"{"Command":"gs","Result":0,"InDeliveryMode":true}"#).unwrap_err(),
            DecodeError::Json(_)
        ));
    }

    #[test]
    fn wrong_types_rejected() {
        assert!(matches!(
            decode(r#"{"Command":7,"Result":0}"#).unwrap_err(),
            DecodeError::Json(_)
        ));
        assert!(matches!(
            decode(r#"{"Command":"gt","Result":"0","Temp":1}"#).unwrap_err(),
            DecodeError::Json(_)
        ));
        assert!(matches!(
            decode(r#"{"Command":"gt","Result":0.5,"Temp":1}"#).unwrap_err(),
            DecodeError::InvalidField { field: "Result", .. }
        ));
        assert!(matches!(
            decode(r#"{"Command":"gt","Result":0,"Temp":"warm"}"#).unwrap_err(),
            DecodeError::Json(_)
        ));
    }

    #[test]
    fn unknown_fields_rejected_for_known_commands() {
        let err = decode(r#"{"Command":"gt","Result":0,"Temp":1,"Humidity":3}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }

    #[test]
    fn invalid_utf8_frame_rejected() {
        let frame = Frame::new(Bytes::from_static(b"{\"Command\":\"\xff\"}"));
        assert!(matches!(
            decode_frame(&frame).unwrap_err(),
            DecodeError::InvalidUtf8(_)
        ));
    }

    #[test]
    fn reencoded_commands_decode_equal() {
        let inputs = [
            r#"{"Command":"gt","Result":0,"Temp":22.5}"#,
            r#"{"Command":"gt","Result":7,"Temp":0}"#,
            r#"{"Command":"gs","Result":0,"InDeliveryMode":True,"ProductFlowing":False,"Error":True,"InCalibration":False}"#,
            r#"{"Command":"gs","Result":-1}"#,
            r#"{"Command":"xx","Result":0}"#,
        ];
        for input in inputs {
            let command = decode(input).unwrap();
            assert_eq!(decode(&command.to_json()).unwrap(), command, "{input}");
        }
    }
}
