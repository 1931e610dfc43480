//! Prelude module for convenient imports.
//!
//! ```
//! use courier::prelude::*;
//! ```

pub use crate::{
    Encoding, ErrorDetails, ErrorKind, HyperTransport, InMemoryFile, Method, MultipartBody, Part,
    RequestContext, ResponseData, RestClient, StatusClass, Transport,
};
