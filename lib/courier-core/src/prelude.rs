//! Prelude module for convenient imports.
//!
//! ```ignore
//! use courier_core::prelude::*;
//! ```

pub use crate::{
    Encoding, ErrorDetails, ErrorKind, ErrorParser, InMemoryFile, Method, MultipartBody, Part,
    Request, Response, ResponseData, ResponseParser, ResponseTarget, StatusClass, Transport,
    TransportError,
};
