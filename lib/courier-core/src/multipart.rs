//! Multipart form data encoding.
//!
//! A [`MultipartBody`] is an ordered list of [`Part`]s. Encoding consumes the
//! body, so every stream a part holds is dropped (closed) before
//! [`MultipartBody::encode`] returns, whether encoding succeeds or not.
//!
//! # Example
//!
//! ```
//! use courier_core::MultipartBody;
//! use serde_json::json;
//!
//! let body = MultipartBody::with_boundary("b0undary")
//!     .add("field", "value")
//!     .add_json("meta", json!({"a": 1}));
//!
//! let (bytes, content_type) = body.encode().expect("encode");
//! assert_eq!(content_type, "multipart/form-data; boundary=b0undary");
//! assert!(bytes.starts_with(b"--b0undary\r\n"));
//! ```

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::{BufMut, Bytes, BytesMut};
use derive_more::{Display, Error, From};

use crate::ErrorDetails;

/// Failure while encoding a multipart body.
#[derive(Debug, Display, Error, From)]
pub enum MultipartError {
    /// Copying a stream into the body failed.
    #[display("multipart stream error: {_0}")]
    Io(io::Error),

    /// A JSON part could not be serialized.
    #[display("multipart JSON error: {_0}")]
    Json(serde_json::Error),
}

impl From<MultipartError> for ErrorDetails {
    fn from(err: MultipartError) -> Self {
        Self::construction(err.to_string())
    }
}

/// A file held in memory, sent with its filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InMemoryFile {
    filename: String,
    data: Bytes,
}

impl InMemoryFile {
    /// Create an in-memory file.
    #[must_use]
    pub fn new(filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            data: data.into(),
        }
    }

    /// File name sent in the content disposition.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// File contents.
    #[must_use]
    pub fn data(&self) -> &Bytes {
        &self.data
    }
}

/// An already opened reader, copied into the body then dropped.
pub struct FileStream {
    filename: String,
    reader: Box<dyn Read + Send>,
}

impl FileStream {
    /// Wrap a reader.
    #[must_use]
    pub fn new(filename: impl Into<String>, reader: impl Read + Send + 'static) -> Self {
        Self {
            filename: filename.into(),
            reader: Box::new(reader),
        }
    }

    /// Open a file from disk; the filename is the last path component.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file = File::open(path)?;
        Ok(Self::new(filename, file))
    }

    /// File name sent in the content disposition.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }
}

impl fmt::Debug for FileStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileStream")
            .field("filename", &self.filename)
            .finish_non_exhaustive()
    }
}

/// Value carried by a part.
#[derive(Debug)]
pub enum PartValue {
    /// UTF-8 text written verbatim.
    Text(String),
    /// Serialized to JSON when the body is encoded.
    Json(serde_json::Value),
    /// File contents already in memory.
    InMemoryFile(InMemoryFile),
    /// Reader copied into the body, then closed.
    Stream(FileStream),
}

impl PartValue {
    /// Short name of the value kind, for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Json(_) => "json",
            Self::InMemoryFile(_) => "file",
            Self::Stream(_) => "stream",
        }
    }

    fn filename(&self) -> Option<&str> {
        match self {
            Self::InMemoryFile(file) => Some(file.filename()),
            Self::Stream(stream) => Some(stream.filename()),
            Self::Text(_) | Self::Json(_) => None,
        }
    }
}

impl From<String> for PartValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for PartValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<serde_json::Value> for PartValue {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl From<InMemoryFile> for PartValue {
    fn from(file: InMemoryFile) -> Self {
        Self::InMemoryFile(file)
    }
}

impl From<FileStream> for PartValue {
    fn from(stream: FileStream) -> Self {
        Self::Stream(stream)
    }
}

/// One named segment of a multipart body.
#[derive(Debug)]
pub struct Part {
    name: String,
    content_type: String,
    value: PartValue,
    include_content_type: bool,
}

impl Part {
    /// Create a part that declares `content_type` in its headers.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        value: impl Into<PartValue>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            value: value.into(),
            include_content_type: true,
        }
    }

    /// Plain text part, no content type header.
    #[must_use]
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            include_content_type: false,
            ..Self::new(name, PartValue::Text(value.into()), "text/plain")
        }
    }

    /// JSON part, declared as `application/json`.
    #[must_use]
    pub fn json(name: impl Into<String>, value: serde_json::Value) -> Self {
        Self::new(name, PartValue::Json(value), "application/json")
    }

    /// File part; the content type is guessed from the filename.
    #[must_use]
    pub fn file(name: impl Into<String>, file: impl Into<PartValue>) -> Self {
        let value = file.into();
        let content_type = value
            .filename()
            .map_or("application/octet-stream", guess_content_type);
        Self::new(name, value, content_type)
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared content type.
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Whether the `Content-Type` header is emitted.
    #[must_use]
    pub const fn include_content_type(&self) -> bool {
        self.include_content_type
    }

    /// Part value.
    #[must_use]
    pub const fn value(&self) -> &PartValue {
        &self.value
    }

    /// Filename of file-like parts.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.value.filename()
    }

    fn write_headers(&self, buf: &mut BytesMut) {
        buf.put_slice(b"Content-Disposition: form-data; name=\"");
        buf.put_slice(escape_quotes(&self.name).as_bytes());
        buf.put_slice(b"\"");
        if let Some(filename) = self.filename() {
            buf.put_slice(b"; filename=\"");
            buf.put_slice(escape_quotes(filename).as_bytes());
            buf.put_slice(b"\"");
        }
        buf.put_slice(b"\r\n");

        if self.include_content_type {
            buf.put_slice(b"Content-Type: ");
            buf.put_slice(self.content_type.as_bytes());
            buf.put_slice(b"\r\n");
        }

        buf.put_slice(b"\r\n");
    }

    fn write_value(self, buf: &mut BytesMut) -> Result<(), MultipartError> {
        match self.value {
            PartValue::Text(text) => buf.put_slice(text.as_bytes()),
            PartValue::Json(value) => {
                let json = serde_json::to_vec(&value)?;
                buf.put_slice(&json);
            }
            PartValue::InMemoryFile(file) => buf.put_slice(&file.data),
            PartValue::Stream(FileStream { mut reader, .. }) => {
                io::copy(&mut reader, &mut (&mut *buf).writer())?;
            }
        }
        Ok(())
    }
}

/// Escape `\` and `"` for use inside a quoted header parameter.
fn escape_quotes(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Guess the content type from a filename extension.
fn guess_content_type(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "xml" => "application/xml",
        "csv" => "text/csv",
        "zip" => "application/zip",
        "gz" | "gzip" => "application/gzip",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}

/// Ordered multipart body.
#[derive(Debug)]
pub struct MultipartBody {
    parts: Vec<Part>,
    boundary: String,
}

impl Default for MultipartBody {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartBody {
    /// Create an empty body with a generated boundary.
    #[must_use]
    pub fn new() -> Self {
        Self::with_boundary(generate_boundary())
    }

    /// Create an empty body with a fixed boundary.
    ///
    /// The boundary must not appear in any part data.
    #[must_use]
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            parts: Vec::new(),
            boundary: boundary.into(),
        }
    }

    /// Append a part.
    #[must_use]
    pub fn part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Append a text field.
    #[must_use]
    pub fn add(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.part(Part::text(name, value))
    }

    /// Append a JSON field.
    #[must_use]
    pub fn add_json(self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.part(Part::json(name, value))
    }

    /// Append any value with an explicit content type header.
    #[must_use]
    pub fn add_with_content_type(
        self,
        name: impl Into<String>,
        value: impl Into<PartValue>,
        content_type: impl Into<String>,
    ) -> Self {
        self.part(Part::new(name, value, content_type))
    }

    /// Append an in-memory file.
    #[must_use]
    pub fn add_file(self, name: impl Into<String>, file: InMemoryFile) -> Self {
        self.part(Part::file(name, file))
    }

    /// Append an open reader.
    #[must_use]
    pub fn add_stream(
        self,
        name: impl Into<String>,
        filename: impl Into<String>,
        reader: impl Read + Send + 'static,
    ) -> Self {
        self.part(Part::file(name, FileStream::new(filename, reader)))
    }

    /// Open `path` and append it as a file part.
    pub fn add_path(self, name: impl Into<String>, path: impl AsRef<Path>) -> io::Result<Self> {
        let stream = FileStream::open(path)?;
        Ok(self.part(Part::file(name, stream)))
    }

    /// Boundary string.
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Parts in insertion order.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// `Content-Type` header value: `multipart/form-data; boundary=<boundary>`.
    #[must_use]
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Encode every part in insertion order.
    ///
    /// Returns the body and its content type. The first failing part aborts
    /// encoding; the partially written buffer is discarded.
    pub fn encode(self) -> Result<(Bytes, String), MultipartError> {
        let content_type = self.content_type();
        let mut buf = BytesMut::new();

        for part in self.parts {
            buf.put_slice(b"--");
            buf.put_slice(self.boundary.as_bytes());
            buf.put_slice(b"\r\n");

            part.write_headers(&mut buf);
            part.write_value(&mut buf)?;
            buf.put_slice(b"\r\n");
        }

        buf.put_slice(b"--");
        buf.put_slice(self.boundary.as_bytes());
        buf.put_slice(b"--\r\n");

        Ok((buf.freeze(), content_type))
    }
}

fn generate_boundary() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);

    format!("----CourierBoundary{timestamp:x}{seq:04x}")
}
