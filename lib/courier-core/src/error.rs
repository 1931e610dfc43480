//! The error envelope returned by every failing dispatch.

use std::time::{SystemTime, UNIX_EPOCH};

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message used whenever the real cause must not leak to the caller.
pub const SOMETHING_WENT_WRONG: &str = "Something went wrong";

/// Message used when the body shape does not match the encoding mode.
pub const INVALID_REQUEST_TYPE: &str = "Invalid request content type";

/// Where an [`ErrorDetails`] came from.
///
/// Not part of the wire envelope; it is lost when an envelope is decoded
/// from a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorKind {
    /// Body shape and encoding mode disagree.
    Configuration,
    /// The outbound request could not be built (bad URL, bad header, body
    /// serialization).
    Construction,
    /// Network failure, timeout or cancellation.
    Transport,
    /// A response body could not be decoded by a parser.
    Decoding,
    /// The remote answered 4xx.
    RemoteClient,
    /// The remote answered 5xx.
    RemoteServer,
    /// Built by hand or decoded from the wire.
    #[default]
    Unspecified,
}

/// Uniform error envelope.
///
/// Serializes as `{"timestamp", "message", "error", "response_code"}`.
/// Missing fields default when decoding, so a remote body carrying only a
/// `message` still decodes.
#[derive(Debug, Clone, PartialEq, Default, Display, Error, Serialize, Deserialize)]
#[display("{message} (response code {response_code})")]
#[serde(default)]
pub struct ErrorDetails {
    /// Construction time, epoch milliseconds.
    pub timestamp: i64,
    /// Human readable message.
    pub message: String,
    /// Opaque payload: a structured body, a raw string or `null`.
    #[error(not(source))]
    pub error: Value,
    /// HTTP status code, the real one for remote failures and 500 otherwise.
    pub response_code: u16,
    /// Failure classification.
    #[serde(skip)]
    pub kind: ErrorKind,
}

impl ErrorDetails {
    /// Build an envelope stamped with the current time.
    #[must_use]
    pub fn generic(message: impl Into<String>, error: impl Into<Value>, response_code: u16) -> Self {
        Self {
            timestamp: now_millis(),
            message: message.into(),
            error: error.into(),
            response_code,
            kind: ErrorKind::Unspecified,
        }
    }

    /// Set the failure classification.
    #[must_use]
    pub const fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }

    /// Encoding mode and body disagree.
    #[must_use]
    pub fn configuration(detail: impl Into<String>) -> Self {
        Self::generic(INVALID_REQUEST_TYPE, detail.into(), 500).with_kind(ErrorKind::Configuration)
    }

    /// The request could not be built.
    #[must_use]
    pub fn construction(cause: impl Into<String>) -> Self {
        Self::generic(cause, SOMETHING_WENT_WRONG, 500).with_kind(ErrorKind::Construction)
    }

    /// The transport failed before a response arrived.
    #[must_use]
    pub fn transport(cause: impl Into<String>) -> Self {
        Self::generic(cause, SOMETHING_WENT_WRONG, 500).with_kind(ErrorKind::Transport)
    }

    /// A body could not be decoded.
    #[must_use]
    pub fn decoding(cause: impl Into<String>) -> Self {
        let cause = cause.into();
        Self::generic(cause.clone(), cause, 500).with_kind(ErrorKind::Decoding)
    }

    /// Returns `true` if the remote answered 4xx.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.response_code)
    }

    /// Returns `true` for a 5xx code, including locally generated failures.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.response_code)
    }

    /// Returns `true` if the call never reached the remote.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self.kind, ErrorKind::Transport)
    }

    /// Decode the `error` payload into a typed value.
    ///
    /// A string payload (the raw remote body) is parsed as JSON, any other
    /// payload is deserialized directly. Returns `None` when the payload is
    /// `null`.
    pub fn decode_error<T: serde::de::DeserializeOwned>(&self) -> Option<Result<T, Self>> {
        match &self.error {
            Value::Null => None,
            Value::String(raw) => Some(crate::from_json(raw.as_bytes())),
            other => Some(crate::from_value(other.clone())),
        }
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
