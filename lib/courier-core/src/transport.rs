//! The transport seam.
//!
//! The dispatcher never talks to the network itself; it hands a built
//! [`Request`] to a [`Transport`] and classifies whatever comes back.
//! Implement the trait to plug in another HTTP stack or a test double.

use std::future::Future;
use std::sync::Arc;

use derive_more::{Display, Error, From};

use crate::{ErrorDetails, Request, Response};

/// Failure reported by a transport before any response arrived.
#[derive(Debug, Display, Error, From)]
pub enum TransportError {
    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// The transport timeout or the request deadline elapsed.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// The request context was cancelled.
    #[display("request cancelled")]
    #[from(skip)]
    Cancelled,

    /// The transport refused the request as built.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),
}

impl TransportError {
    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

impl From<TransportError> for ErrorDetails {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::InvalidRequest(_) | TransportError::InvalidUrl(_) => {
                Self::construction(err.to_string())
            }
            _ => Self::transport(err.to_string()),
        }
    }
}

/// Executes one HTTP request.
///
/// Implementations must be safe to share between concurrent dispatches and
/// must read the whole response body before returning.
pub trait Transport: Send + Sync {
    /// Execute an HTTP request and return the response.
    ///
    /// # Errors
    ///
    /// Returns an error if no response could be obtained:
    /// - Network errors
    /// - TLS errors
    /// - Timeouts
    fn execute(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<Response, TransportError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn execute(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<Response, TransportError>> + Send {
        (**self).execute(request)
    }
}
