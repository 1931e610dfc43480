//! HTTP response returned by a transport, and the minimal result shape.

use std::collections::HashMap;

use bytes::Bytes;

use crate::{ErrorDetails, StatusClass};

/// HTTP response with status, headers, and a fully read body.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: HashMap<String, String>,
    body: Bytes,
}

impl Response {
    /// Creates a new response.
    #[must_use]
    pub fn new(status: u16, headers: HashMap<String, String>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Status class, `None` outside `100..=599`.
    #[must_use]
    pub const fn status_class(&self) -> Option<StatusClass> {
        StatusClass::from_status(self.status)
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Single header value by name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Response body.
    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// Consume into body.
    #[must_use]
    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status_class(), Some(StatusClass::Successful))
    }
}

/// Minimal result shape for call sites that only want the raw exchange.
///
/// `response_code` is `None` when the call never completed; in that case
/// `error` is set and `response` is empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseData {
    /// Status code, if a response arrived.
    pub response_code: Option<u16>,
    /// Failure, local or remote.
    pub error: Option<ErrorDetails>,
    /// Raw response body, empty when no response arrived.
    pub response: String,
}

impl ResponseData {
    /// Returns `true` if a 2xx response arrived and no error was recorded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
            && self
                .response_code
                .is_some_and(|code| StatusClass::from_status(code) == Some(StatusClass::Successful))
    }

    /// Turn into a `Result`, keeping the body on success.
    pub fn into_result(self) -> Result<String, ErrorDetails> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.response),
        }
    }
}
