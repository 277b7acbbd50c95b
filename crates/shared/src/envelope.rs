//! Decoding of the `{success, data?, error?}` response wrapper.
//!
//! Every endpoint goes through [`decode_envelope`] or [`decode_ack`] so the
//! contract is checked in exactly one place.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GatewayError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    success: Option<bool>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn is_auth_status(status: u16) -> bool {
    status == 401 || status == 403
}

fn is_success_status(status: u16) -> bool {
    (200..300).contains(&status)
}

fn parse_raw(status: u16, body: &[u8]) -> Result<RawEnvelope, GatewayError> {
    let raw: RawEnvelope = match serde_json::from_slice(body) {
        Ok(raw) => raw,
        Err(_) if is_auth_status(status) => return Err(GatewayError::AuthRequired(None)),
        Err(err) => {
            return Err(GatewayError::Protocol(format!(
                "status {status}: body is not a JSON envelope: {err}"
            )))
        }
    };

    match raw.success {
        Some(true) if !is_success_status(status) => Err(GatewayError::Protocol(format!(
            "status {status} reported success"
        ))),
        Some(true) => Ok(raw),
        Some(false) => {
            let message = raw.error.or(raw.message);
            if is_auth_status(status) {
                return Err(GatewayError::AuthRequired(message));
            }
            match message {
                Some(message) => Err(GatewayError::Domain(message)),
                None => Err(GatewayError::Protocol(format!(
                    "status {status}: failure envelope without error message"
                ))),
            }
        }
        None if is_auth_status(status) => Err(GatewayError::AuthRequired(None)),
        None => Err(GatewayError::Protocol(format!(
            "status {status}: envelope is missing `success`"
        ))),
    }
}

/// Decodes a data-carrying envelope into `T`.
pub fn decode_envelope<T: DeserializeOwned>(status: u16, body: &[u8]) -> Result<T, GatewayError> {
    let raw = parse_raw(status, body)?;
    let data = match raw.data {
        Some(Value::Null) | None => {
            return Err(GatewayError::Protocol(
                "successful envelope is missing `data`".to_string(),
            ))
        }
        Some(data) => data,
    };
    serde_json::from_value(data)
        .map_err(|err| GatewayError::Protocol(format!("unexpected `data` shape: {err}")))
}

/// Decodes an envelope where only `success` matters.
pub fn decode_ack(status: u16, body: &[u8]) -> Result<(), GatewayError> {
    parse_raw(status, body).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Counter {
        total: u32,
    }

    #[test]
    fn decodes_successful_payload() {
        let body = br#"{"success":true,"data":{"total":3}}"#;
        let counter: Counter = decode_envelope(200, body).expect("decode");
        assert_eq!(counter, Counter { total: 3 });
    }

    #[test]
    fn failure_envelope_is_domain_error() {
        let body = br#"{"success":false,"error":"timeout"}"#;
        let err = decode_envelope::<Counter>(200, body).expect_err("domain error");
        assert_eq!(err, GatewayError::Domain("timeout".into()));

        let body = br#"{"success":false,"message":"Invalid input"}"#;
        let err = decode_envelope::<Counter>(400, body).expect_err("domain error");
        assert_eq!(err, GatewayError::Domain("Invalid input".into()));
    }

    #[test]
    fn unauthorised_answers_are_auth_required() {
        let body = br#"{"success":false,"error":"Not authenticated"}"#;
        assert_eq!(
            decode_envelope::<Counter>(401, body).expect_err("auth"),
            GatewayError::AuthRequired(Some("Not authenticated".into()))
        );
        assert_eq!(
            decode_envelope::<Counter>(403, b"<html>").expect_err("auth"),
            GatewayError::AuthRequired(None)
        );
        assert_eq!(
            decode_envelope::<Counter>(401, br#"{"detail":"nope"}"#).expect_err("auth"),
            GatewayError::AuthRequired(None)
        );
    }

    #[test]
    fn contract_violations_are_protocol_errors() {
        let cases: [(u16, &[u8]); 6] = [
            (200, b"not json"),
            (200, br#"{"data":{"total":1}}"#),
            (200, br#"{"success":true}"#),
            (200, br#"{"success":true,"data":null}"#),
            (200, br#"{"success":true,"data":{"count":1}}"#),
            (500, br#"{"success":true,"data":{"total":1}}"#),
        ];
        for (status, body) in cases {
            let err = decode_envelope::<Counter>(status, body).expect_err("protocol");
            assert!(
                matches!(err, GatewayError::Protocol(_)),
                "status {status} body {:?} gave {err:?}",
                String::from_utf8_lossy(body)
            );
        }

        let err = decode_envelope::<Counter>(500, br#"{"success":false}"#).expect_err("protocol");
        assert!(matches!(err, GatewayError::Protocol(_)));
    }

    #[test]
    fn ack_only_requires_success() {
        decode_ack(200, br#"{"success":true}"#).expect("ack");
        assert!(decode_ack(200, br#"{"success":false,"error":"nope"}"#).is_err());
    }
}
