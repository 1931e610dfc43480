//! Fluent outbound HTTP requests with uniform error envelopes.
//!
//! Configure a request by chaining, dispatch it with a verb, and get either
//! `Ok(())` with the decoded body in your target or an [`ErrorDetails`].
//!
//! # Example
//!
//! ```no_run
//! use courier::prelude::*;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize)]
//! struct NewUser<'a> {
//!     name: &'a str,
//! }
//!
//! #[derive(Debug, Default, Deserialize)]
//! struct Created {
//!     id: u64,
//! }
//!
//! # async fn run() -> Result<(), ErrorDetails> {
//! let client = RestClient::default_client().host("https://api.example.com");
//!
//! let mut created = Created::default();
//! client
//!     .request()
//!     .body(&NewUser { name: "Ada" })?
//!     .response(&mut created)
//!     .post("/users")
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! Multipart and form bodies pick their own wire format:
//!
//! ```no_run
//! use courier::prelude::*;
//!
//! # async fn run(client: RestClient) -> Result<(), ErrorDetails> {
//! let parts = MultipartBody::new()
//!     .add("title", "report")
//!     .add_json("meta", serde_json::json!({"pages": 3}));
//! client.request().multipart(parts).post("/upload").await?;
//!
//! client
//!     .request()
//!     .form([("grant_type", "client_credentials")])
//!     .encoding(Encoding::FormUrlEncoded)
//!     .post("/oauth/token")
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod builder;
mod config;
mod connector;
mod context;
mod dispatch;
pub mod middleware;
pub mod prelude;
mod transport;

pub use builder::{Body, RequestBuilder, RestClient};
pub use config::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT, TransportConfig, TransportConfigBuilder,
};
pub use connector::https_connector;
pub use context::{CancelHandle, RequestContext};
pub use transport::{BoxedService, HyperTransport, HyperTransportBuilder, ServiceFuture};

// Re-export tower for middleware composition
pub use tower;

// Re-export core types
pub use courier_core::{
    Encoding, ErrorDetails, ErrorKind, ErrorParser, FileStream, HeaderMap, HeaderValue,
    INVALID_REQUEST_TYPE, InMemoryFile, JsonErrorParser, JsonResponseParser, Method,
    MultipartBody, MultipartError, Part, PartValue, Request, Response, ResponseData,
    ResponseParser, ResponseTarget, SOMETHING_WENT_WRONG, StatusClass, TextResponseParser,
    Transport, TransportError, X_REQUEST_ID, from_json, header, pretty_json, series, to_form,
    to_json,
};
