//! Pluggable response and error parsers.
//!
//! A [`ResponseParser`] turns a 2xx body into a value and stores it in the
//! caller's [`ResponseTarget`]; an [`ErrorParser`] turns a 4xx body into an
//! [`ErrorDetails`]. Both are implemented for plain closures, so a parser
//! can be swapped per request without declaring a type:
//!
//! ```
//! use courier_core::{ErrorDetails, ErrorParser};
//!
//! let parser = |body: &str| ErrorDetails::generic(body.trim(), body, 400);
//! assert_eq!(parser.parse(" bad input ").message, "bad input");
//! ```

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{ErrorDetails, SOMETHING_WENT_WRONG, from_json, from_value};

/// Out-parameter populated by a [`ResponseParser`] on success.
///
/// Implemented for every deserializable type, so `&mut MyDto` can be passed
/// wherever a target is expected.
pub trait ResponseTarget: Send {
    /// Replace the target with the decoded value.
    fn fill(&mut self, value: Value) -> Result<(), ErrorDetails>;
}

impl<T: DeserializeOwned + Send> ResponseTarget for T {
    fn fill(&mut self, value: Value) -> Result<(), ErrorDetails> {
        *self = from_value(value)?;
        Ok(())
    }
}

/// Decodes a successful response body into a target.
pub trait ResponseParser: Send + Sync {
    /// Decode `body` and fill `target`.
    fn parse(&self, body: &str, target: &mut dyn ResponseTarget) -> Result<(), ErrorDetails>;
}

impl<F> ResponseParser for F
where
    F: Fn(&str, &mut dyn ResponseTarget) -> Result<(), ErrorDetails> + Send + Sync,
{
    fn parse(&self, body: &str, target: &mut dyn ResponseTarget) -> Result<(), ErrorDetails> {
        self(body, target)
    }
}

/// Decodes a client error body into an error envelope.
pub trait ErrorParser: Send + Sync {
    /// Decode `body`. Never fails: undecodable bodies yield a generic envelope.
    fn parse(&self, body: &str) -> ErrorDetails;
}

impl<F> ErrorParser for F
where
    F: Fn(&str) -> ErrorDetails + Send + Sync,
{
    fn parse(&self, body: &str) -> ErrorDetails {
        self(body)
    }
}

/// Default response parser: the body is JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonResponseParser;

impl ResponseParser for JsonResponseParser {
    fn parse(&self, body: &str, target: &mut dyn ResponseTarget) -> Result<(), ErrorDetails> {
        let value: Value = from_json(body.as_bytes())?;
        target.fill(value)
    }
}

/// Response parser handing the raw body to the target as a JSON string.
///
/// Pairs with a `String` target for plain-text endpoints.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextResponseParser;

impl ResponseParser for TextResponseParser {
    fn parse(&self, body: &str, target: &mut dyn ResponseTarget) -> Result<(), ErrorDetails> {
        target.fill(Value::String(body.to_string()))
    }
}

/// Default error parser: the body is a JSON error envelope.
///
/// The decoded `message` and `response_code` are kept, the raw body becomes
/// the `error` payload. A body that is not an envelope yields
/// `"Something went wrong"` with status 500.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonErrorParser;

impl ErrorParser for JsonErrorParser {
    fn parse(&self, body: &str) -> ErrorDetails {
        match serde_json::from_str::<ErrorDetails>(body) {
            Ok(envelope) => ErrorDetails::generic(envelope.message, body, envelope.response_code),
            Err(_) => ErrorDetails::generic(SOMETHING_WENT_WRONG, Value::Null, 500),
        }
    }
}
