//! Body serialization utilities.

use bytes::Bytes;
use serde::Serialize;

use crate::ErrorDetails;

/// Wire serialization chosen for a request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Encoding {
    /// `application/json`.
    #[default]
    Json,
    /// `multipart/form-data`; the effective content type carries the boundary.
    Multipart,
    /// `application/x-www-form-urlencoded`.
    FormUrlEncoded,
}

impl Encoding {
    /// Get the MIME type string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Multipart => "multipart/form-data",
            Self::FormUrlEncoded => "application/x-www-form-urlencoded",
        }
    }
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Serialize a value to JSON bytes.
///
/// # Example
///
/// ```
/// use courier_core::to_json;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct User { name: String }
///
/// let user = User { name: "Alice".to_string() };
/// let bytes = to_json(&user).expect("serialize");
/// assert_eq!(bytes.as_ref(), br#"{"name":"Alice"}"#);
/// ```
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Bytes, ErrorDetails> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|e| ErrorDetails::construction(e.to_string()))
}

/// Serialize a flat map or struct to form URL-encoded bytes.
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
/// use courier_core::to_form;
///
/// let form = BTreeMap::from([("password", "s3cr&t"), ("username", "alice")]);
/// let bytes = to_form(&form).expect("serialize");
/// assert_eq!(bytes.as_ref(), b"password=s3cr%26t&username=alice");
/// ```
pub fn to_form<T: Serialize + ?Sized>(value: &T) -> Result<Bytes, ErrorDetails> {
    serde_html_form::to_string(value)
        .map(|s| Bytes::from(s.into_bytes()))
        .map_err(|e| ErrorDetails::construction(e.to_string()))
}

/// Deserialize JSON bytes with path-aware error messages.
///
/// The message of the returned error names the failing field
/// (e.g. `user.address.city`).
pub fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, ErrorDetails> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        ErrorDetails::decoding(format!(
            "JSON deserialization error at '{}': {}",
            e.path(),
            e.inner()
        ))
    })
}

/// Deserialize an already parsed JSON value, with the same error shape as
/// [`from_json`].
pub fn from_value<T: serde::de::DeserializeOwned>(
    value: serde_json::Value,
) -> Result<T, ErrorDetails> {
    serde_path_to_error::deserialize(value).map_err(|e| {
        ErrorDetails::decoding(format!(
            "JSON deserialization error at '{}': {}",
            e.path(),
            e.inner()
        ))
    })
}

/// Re-indent a JSON document with tabs.
///
/// Returns `None` when the bytes are not JSON; callers keep the raw text.
#[must_use]
pub fn pretty_json(bytes: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(bytes).ok()?;
    let mut out = Vec::with_capacity(bytes.len());
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer).ok()?;
    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use assert2::{check, let_assert};

    use super::*;
    use crate::ErrorKind;

    #[test]
    fn encoding_as_str() {
        check!(Encoding::Json.as_str() == "application/json");
        check!(Encoding::Multipart.as_str() == "multipart/form-data");
        check!(Encoding::FormUrlEncoded.as_str() == "application/x-www-form-urlencoded");
        check!(Encoding::default() == Encoding::Json);
        check!(Encoding::FormUrlEncoded.to_string() == "application/x-www-form-urlencoded");
    }

    #[test]
    fn to_json_serialize() {
        #[derive(serde::Serialize)]
        struct User {
            name: String,
            age: u32,
        }

        let user = User {
            name: "Alice".to_string(),
            age: 30,
        };

        let bytes = to_json(&user).expect("serialize");
        check!(bytes.as_ref() == br#"{"name":"Alice","age":30}"#);
    }

    #[test]
    fn to_form_escapes_values() {
        let mut form = BTreeMap::new();
        form.insert("q".to_string(), "rust lang".to_string());
        form.insert("tag".to_string(), "a&b=c".to_string());

        let bytes = to_form(&form).expect("serialize");
        check!(bytes.as_ref() == b"q=rust+lang&tag=a%26b%3Dc");
    }

    #[test]
    fn from_json_missing_field_error_with_path() {
        #[derive(Debug, serde::Deserialize)]
        struct Address {
            #[allow(dead_code)]
            city: String,
        }

        #[derive(Debug, serde::Deserialize)]
        struct User {
            #[allow(dead_code)]
            address: Address,
        }

        let result: Result<User, _> = from_json(br#"{"address":{}}"#);
        let_assert!(Err(err) = result);
        check!(err.kind == ErrorKind::Decoding);
        check!(err.response_code == 500);
        check!(err.message.contains("address"));
        check!(err.message.contains("city"));
    }

    #[test]
    fn from_json_syntax_error() {
        let result: Result<serde_json::Value, _> = from_json(b"not json");
        let_assert!(Err(err) = result);
        check!(err.message.contains("JSON deserialization error"));
    }

    #[test]
    fn pretty_json_uses_tabs() {
        let pretty = pretty_json(br#"{"id":7}"#).expect("json");
        check!(pretty == "{\n\t\"id\": 7\n}");
    }

    #[test]
    fn pretty_json_rejects_text() {
        check!(pretty_json(b"<html>oops</html>").is_none());
        check!(pretty_json(b"").is_none());
    }
}
