//! Core types and traits for the courier HTTP request builder.
//!
//! This crate holds everything that does not touch the network:
//! - [`Method`] - HTTP verbs
//! - [`StatusClass`] and [`series`] - status code classification
//! - [`Encoding`] and the body helpers [`to_json`], [`to_form`], [`from_json`]
//! - [`MultipartBody`] and [`Part`] - the multipart encoder
//! - [`ErrorDetails`] - the uniform error envelope
//! - [`Request`], [`Response`] and [`ResponseData`]
//! - [`Transport`] - the seam to an HTTP implementation
//! - [`ResponseParser`], [`ErrorParser`] and [`ResponseTarget`] - pluggable decoding

mod body;
mod error;
mod method;
mod multipart;
mod parser;
pub mod prelude;
mod request;
mod response;
mod status;
mod transport;

pub use body::{Encoding, from_json, from_value, pretty_json, to_form, to_json};
pub use error::{ErrorDetails, ErrorKind, INVALID_REQUEST_TYPE, SOMETHING_WENT_WRONG};
pub use method::Method;
pub use multipart::{FileStream, InMemoryFile, MultipartBody, MultipartError, Part, PartValue};
pub use parser::{
    ErrorParser, JsonErrorParser, JsonResponseParser, ResponseParser, ResponseTarget,
    TextResponseParser,
};
pub use request::{Request, X_REQUEST_ID};
pub use response::{Response, ResponseData};
pub use status::{StatusClass, series};
pub use transport::{Transport, TransportError};

// Re-export http crate types for headers
pub use http::{HeaderMap, HeaderValue, header};
