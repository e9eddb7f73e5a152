//! JSON-RPC envelopes and NUL-byte framing.
//!
//! A request is `{"jsonrpc":"2.0","method":M,"id":N,"params":{..}}` encoded
//! as UTF-8 and followed by a single NUL byte. `params` is omitted entirely
//! when the command carries no parameters. The gateway concatenates multiple
//! NUL-terminated messages into one physical frame when it feels like it, so
//! inbound frames must be split on the terminator before parsing.

use serde::Deserialize;
use serde_json::Value;

use crate::command::Command;
use crate::error::CodecError;

/// JSON-RPC protocol version sent in every request.
pub const JSONRPC_VERSION: &str = "2.0";

/// Terminator appended after each serialized envelope.
pub const FRAME_TERMINATOR: u8 = 0x00;

/// A decoded response envelope.
///
/// The service signals success by the presence of `result`; `error` carries
/// the failure object otherwise. The connection layer only distinguishes
/// presence from absence of `result`.
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    pub id: i64,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

/// Encodes `command` into a framed request envelope carrying `id`.
pub fn encode_request<C: Command>(command: &C, id: i64) -> Result<Vec<u8>, CodecError> {
    let mut envelope = serde_json::Map::new();
    envelope.insert("jsonrpc".into(), Value::from(JSONRPC_VERSION));
    envelope.insert("method".into(), Value::from(command.method()));
    envelope.insert("id".into(), Value::from(id));

    match serde_json::to_value(command)? {
        Value::Object(params) if params.is_empty() => {}
        Value::Null => {}
        params => {
            envelope.insert("params".into(), params);
        }
    }

    let mut bytes = serde_json::to_vec(&Value::Object(envelope))?;
    bytes.push(FRAME_TERMINATOR);
    Ok(bytes)
}

/// Splits a physical frame into its NUL-terminated logical messages.
///
/// Empty segments (the trailing terminator, keep-alive frames) are skipped.
pub fn split_frame(frame: &[u8]) -> impl Iterator<Item = &[u8]> {
    frame
        .split(|byte| *byte == FRAME_TERMINATOR)
        .filter(|part| !part.is_empty())
}

/// Decodes one logical message into a [`Response`].
pub fn decode_response(message: &[u8]) -> Result<Response, CodecError> {
    let text = std::str::from_utf8(message)?;
    let value: Value = serde_json::from_str(text)?;
    if value.get("id").is_none() {
        return Err(CodecError::MissingId);
    }
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::command::{ReadHardwareSerial, RegisterClient};

    #[test]
    fn request_carries_version_method_and_id() {
        let bytes = encode_request(&RegisterClient::new("unit-test"), 3).unwrap();
        assert_eq!(bytes.last(), Some(&FRAME_TERMINATOR));

        let envelope: Value = serde_json::from_slice(&bytes[..bytes.len() - 1]).unwrap();
        assert_eq!(
            envelope,
            json!({
                "jsonrpc": "2.0",
                "method": "rpc_client_register",
                "id": 3,
                "params": { "name": "unit-test" },
            })
        );
    }

    #[test]
    fn empty_params_are_omitted() {
        let bytes = encode_request(&ReadHardwareSerial {}, 0).unwrap();
        let envelope: Value = serde_json::from_slice(&bytes[..bytes.len() - 1]).unwrap();
        assert_eq!(envelope.get("params"), None);
    }

    #[test]
    fn splits_batched_frames() {
        let frame = b"{\"id\":1}\0{\"id\":2}\0";
        let parts: Vec<&[u8]> = split_frame(frame).collect();
        assert_eq!(parts, vec![&b"{\"id\":1}"[..], &b"{\"id\":2}"[..]]);
    }

    #[test]
    fn decodes_result_and_error_bodies() {
        let ok = decode_response(br#"{"id":4,"result":{"success":true}}"#).unwrap();
        assert_eq!(ok.id, 4);
        assert!(ok.result.is_some());
        assert!(ok.error.is_none());

        let failed = decode_response(br#"{"id":5,"error":{"code":-32601}}"#).unwrap();
        assert_eq!(failed.id, 5);
        assert!(failed.result.is_none());
        assert!(failed.error.is_some());
    }

    #[test]
    fn message_without_id_is_not_a_response() {
        let err = decode_response(br#"{"method":"broadcast"}"#).unwrap_err();
        assert!(matches!(err, CodecError::MissingId));
    }

    #[test]
    fn malformed_message_is_a_json_error() {
        let err = decode_response(b"{not json").unwrap_err();
        assert!(matches!(err, CodecError::Json(_)));
    }
}
