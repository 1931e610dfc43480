//! Executes a configured request and classifies the outcome.
//!
//! Every failure, local or remote, ends up as an [`ErrorDetails`] inside the
//! returned [`ResponseData`]; nothing on this path panics.

use std::collections::BTreeMap;

use bytes::Bytes;
use courier_core::header::{CONTENT_TYPE, HeaderName};
use courier_core::{
    Encoding, ErrorDetails, ErrorKind, ErrorParser, HeaderValue, Method, MultipartBody, Request,
    ResponseData, ResponseParser, ResponseTarget, SOMETHING_WENT_WRONG, StatusClass, Transport,
    X_REQUEST_ID, pretty_json, to_form, to_json,
};
use serde_json::{Map, Value};
use tracing::{Instrument, Level, debug, info, info_span, warn};
use url::Url;
use uuid::Uuid;

use crate::builder::{Body, RequestConfig};

pub(crate) async fn dispatch<T: Transport>(
    transport: &T,
    config: RequestConfig,
    target: Option<&mut dyn ResponseTarget>,
    method: Method,
    endpoint: &str,
) -> ResponseData {
    let request_id = Uuid::new_v4().to_string();
    let url = format!("{}{endpoint}", config.template.host);
    let span = info_span!("dispatch", %method, %url, %request_id);

    execute(transport, config, target, method, url, request_id)
        .instrument(span)
        .await
}

async fn execute<T: Transport>(
    transport: &T,
    config: RequestConfig,
    target: Option<&mut dyn ResponseTarget>,
    method: Method,
    url: String,
    request_id: String,
) -> ResponseData {
    let RequestConfig {
        template,
        body,
        context,
    } = config;

    let request = match encode_body(template.encoding, body).and_then(|(payload, content_type)| {
        build_request(
            method,
            &url,
            payload,
            &content_type,
            &request_id,
            template.headers,
            &template.params,
        )
    }) {
        Ok(request) => request,
        Err(err) => {
            warn!(error = %err, kind = ?err.kind, "request could not be built");
            return failed(err);
        }
    };

    debug!(bytes = request.body().len(), "--> {method} {url}");

    let call = transport.execute(request);
    let result = match &context {
        Some(context) => context.run(call).await,
        None => call.await,
    };
    let response = match result {
        Ok(response) => response,
        Err(err) => {
            warn!(error = %err, "transport failed");
            return failed(err.into());
        }
    };

    let status = response.status();
    let raw = response.into_body();
    let body = body_text(&raw);

    if tracing::enabled!(Level::DEBUG) {
        let shown = pretty_json(&raw).unwrap_or_else(|| body.clone());
        debug!("<-- {status}\n{shown}");
    }

    let outcome = classify(
        status,
        &body,
        target,
        template.parser.as_ref(),
        template.error_parser.as_ref(),
    );
    if let Err(err) = &outcome {
        info!(status, body = %body, "<-- {status}: {}", err.message);
    }

    ResponseData {
        response_code: Some(status),
        error: outcome.err(),
        response: body,
    }
}

fn failed(err: ErrorDetails) -> ResponseData {
    ResponseData {
        response_code: None,
        error: Some(err),
        response: String::new(),
    }
}

/// Serialize `body` for `encoding`, returning the payload and its content type.
fn encode_body(encoding: Encoding, body: Body) -> Result<(Bytes, String), ErrorDetails> {
    let content_type = encoding.as_str().to_string();
    match (encoding, body) {
        (Encoding::Json, Body::Empty) => Ok((Bytes::new(), content_type)),
        (Encoding::Json, Body::Json(value)) => Ok((to_json(&value)?, content_type)),
        (Encoding::Json, Body::Form(fields)) => Ok((to_json(&fields)?, content_type)),
        (Encoding::Json, Body::Raw(text)) => Ok((to_json(&text)?, content_type)),

        (Encoding::Multipart, Body::Empty) => Ok(MultipartBody::new().encode()?),
        (Encoding::Multipart, Body::Multipart(parts)) => Ok(parts.encode()?),

        (Encoding::FormUrlEncoded, Body::Form(fields)) => Ok((to_form(&fields)?, content_type)),
        (Encoding::FormUrlEncoded, Body::Json(Value::Object(map))) => {
            let fields = string_fields(map)?;
            Ok((to_form(&fields)?, content_type))
        }

        (encoding, body) => Err(ErrorDetails::configuration(format!(
            "{} body cannot be sent as {encoding}",
            body.kind()
        ))),
    }
}

/// Flatten a JSON object whose values are all strings.
fn string_fields(map: Map<String, Value>) -> Result<BTreeMap<String, String>, ErrorDetails> {
    map.into_iter()
        .map(|(name, value)| match value {
            Value::String(text) => Ok((name, text)),
            other => Err(ErrorDetails::configuration(format!(
                "form field `{name}` is not a string: {other}"
            ))),
        })
        .collect()
}

/// Body text handed to parsers; invalid UTF-8 is replaced.
fn body_text(raw: &[u8]) -> String {
    match std::str::from_utf8(raw) {
        Ok(text) => text.to_owned(),
        Err(err) => {
            debug!(
                valid_up_to = err.valid_up_to(),
                bytes = raw.len(),
                "response body is not valid UTF-8, invalid sequences replaced"
            );
            String::from_utf8_lossy(raw).into_owned()
        }
    }
}

fn build_request(
    method: Method,
    url: &str,
    payload: Bytes,
    content_type: &str,
    request_id: &str,
    headers: BTreeMap<String, String>,
    params: &BTreeMap<String, String>,
) -> Result<Request, ErrorDetails> {
    let url = Url::parse(url)
        .map_err(|e| ErrorDetails::construction(format!("invalid URL `{url}`: {e}")))?;

    let mut request = Request::new(method, url).with_body(payload);

    let map = request.headers_mut();
    map.insert(CONTENT_TYPE, header_value(content_type)?);
    map.insert(X_REQUEST_ID, header_value(request_id)?);
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ErrorDetails::construction(format!("invalid header name `{name}`: {e}")))?;
        // a caller header never replaces a base header, both are sent
        map.append(name, header_value(&value)?);
    }

    if !params.is_empty() {
        let mut query = request.url_mut().query_pairs_mut();
        for (name, value) in params {
            query.append_pair(name, value);
        }
    }

    Ok(request)
}

fn header_value(value: &str) -> Result<HeaderValue, ErrorDetails> {
    HeaderValue::from_str(value)
        .map_err(|e| ErrorDetails::construction(format!("invalid header value `{value}`: {e}")))
}

fn classify(
    status: u16,
    body: &str,
    target: Option<&mut dyn ResponseTarget>,
    parser: &dyn ResponseParser,
    error_parser: &dyn ErrorParser,
) -> Result<(), ErrorDetails> {
    match StatusClass::from_status(status) {
        Some(StatusClass::Successful) => match target {
            Some(target) => parser.parse(body, target),
            None => Ok(()),
        },
        Some(StatusClass::ClientError) => {
            let parsed = error_parser.parse(body);
            Err(ErrorDetails::generic(parsed.message, body, status)
                .with_kind(ErrorKind::RemoteClient))
        }
        Some(StatusClass::ServerError) => Err(ErrorDetails::generic(
            SOMETHING_WENT_WRONG,
            body,
            status,
        )
        .with_kind(ErrorKind::RemoteServer)),
        Some(StatusClass::Informational | StatusClass::Redirection) | None => {
            debug!(status, "status is neither success nor error, nothing to decode");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use serde_json::json;

    use super::*;

    fn form(fields: &[(&str, &str)]) -> Body {
        Body::Form(
            fields
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        )
    }

    #[test]
    fn json_encoding() {
        let_assert!(
            Ok((payload, content_type)) = encode_body(Encoding::Json, Body::Json(json!({"a": 1})))
        );
        check!(payload.as_ref() == br#"{"a":1}"#);
        check!(content_type == "application/json");

        let_assert!(Ok((payload, _)) = encode_body(Encoding::Json, Body::Empty));
        check!(payload.is_empty());

        let_assert!(Ok((payload, _)) = encode_body(Encoding::Json, Body::Raw("hi".into())));
        check!(payload.as_ref() == br#""hi""#);
    }

    #[test]
    fn form_encoding() {
        let_assert!(
            Ok((payload, content_type)) =
                encode_body(Encoding::FormUrlEncoded, form(&[("name", "Ada L"), ("age", "36")]))
        );
        check!(payload.as_ref() == b"age=36&name=Ada+L");
        check!(content_type == "application/x-www-form-urlencoded");
    }

    #[test]
    fn form_encoding_accepts_string_object() {
        let body = Body::Json(json!({"user": "ada", "role": "admin"}));
        let_assert!(Ok((payload, content_type)) = encode_body(Encoding::FormUrlEncoded, body));
        check!(payload.as_ref() == b"role=admin&user=ada");
        check!(content_type == "application/x-www-form-urlencoded");
    }

    #[test]
    fn form_mode_rejects_other_bodies() {
        for body in [
            Body::Empty,
            Body::Json(json!({"a": 1})),
            Body::Json(json!(["a", "b"])),
            Body::Raw("a=1".into()),
        ] {
            let_assert!(Err(err) = encode_body(Encoding::FormUrlEncoded, body));
            check!(err.kind == ErrorKind::Configuration);
            check!(err.response_code == 500);
            check!(err.message == courier_core::INVALID_REQUEST_TYPE);
        }
    }

    #[test]
    fn body_text_replaces_invalid_utf8() {
        check!(body_text(b"{\"ok\":true}") == r#"{"ok":true}"#);
        check!(body_text(b"caf\xe9") == "caf\u{fffd}");
    }

    #[test]
    fn multipart_encoding_adopts_boundary() {
        let body = Body::Multipart(MultipartBody::with_boundary("XYZ").add("a", "1"));
        let_assert!(Ok((payload, content_type)) = encode_body(Encoding::Multipart, body));
        check!(content_type == "multipart/form-data; boundary=XYZ");
        check!(String::from_utf8_lossy(&payload).starts_with("--XYZ\r\n"));
    }

    #[test]
    fn mismatched_multipart_is_rejected() {
        let body = Body::Multipart(MultipartBody::new());
        let_assert!(Err(err) = encode_body(Encoding::Json, body));
        check!(err.kind == ErrorKind::Configuration);
    }

    #[test]
    fn request_headers_and_query() {
        let headers = BTreeMap::from([
            ("content-type".to_string(), "text/plain".to_string()),
            ("X-Trace".to_string(), "t-1".to_string()),
        ]);
        let params = BTreeMap::from([
            ("q".to_string(), "a b".to_string()),
            ("page".to_string(), "2".to_string()),
        ]);

        let_assert!(
            Ok(request) = build_request(
                Method::Get,
                "http://api.local/search?lang=en",
                Bytes::new(),
                "application/json",
                "req-1",
                headers,
                &params,
            )
        );

        check!(request.url().as_str() == "http://api.local/search?lang=en&page=2&q=a+b");
        check!(request.request_id() == Some("req-1"));
        check!(request.header("x-trace") == Some("t-1"));
        let content_types: Vec<_> = request.headers().get_all(CONTENT_TYPE).iter().collect();
        check!(content_types == ["application/json", "text/plain"]);
    }

    #[test]
    fn invalid_url_is_construction_error() {
        let_assert!(
            Err(err) = build_request(
                Method::Get,
                "not a url/users",
                Bytes::new(),
                "application/json",
                "req-1",
                BTreeMap::new(),
                &BTreeMap::new(),
            )
        );
        check!(err.kind == ErrorKind::Construction);
        check!(err.response_code == 500);
    }

    #[test]
    fn invalid_header_is_construction_error() {
        let headers = BTreeMap::from([("bad header".to_string(), "x".to_string())]);
        let_assert!(
            Err(err) = build_request(
                Method::Get,
                "http://api.local/",
                Bytes::new(),
                "application/json",
                "req-1",
                headers,
                &BTreeMap::new(),
            )
        );
        check!(err.kind == ErrorKind::Construction);
    }

    #[test]
    fn classify_success_fills_target() {
        let mut target = Value::Null;
        let result = classify(
            201,
            r#"{"id":7}"#,
            Some(&mut target),
            &courier_core::JsonResponseParser,
            &courier_core::JsonErrorParser,
        );
        check!(result.is_ok());
        check!(target == json!({"id": 7}));
    }

    #[test]
    fn classify_success_without_target() {
        let result = classify(
            200,
            "not json",
            None,
            &courier_core::JsonResponseParser,
            &courier_core::JsonErrorParser,
        );
        check!(result.is_ok());
    }

    #[test]
    fn classify_client_error() {
        let body = r#"{"message":"not found","response_code":404}"#;
        let_assert!(
            Err(err) = classify(
                404,
                body,
                None,
                &courier_core::JsonResponseParser,
                &courier_core::JsonErrorParser,
            )
        );
        check!(err.message == "not found");
        check!(err.response_code == 404);
        check!(err.error == Value::String(body.to_string()));
        check!(err.kind == ErrorKind::RemoteClient);
    }

    #[test]
    fn classify_server_error() {
        let_assert!(
            Err(err) = classify(
                503,
                "upstream down",
                None,
                &courier_core::JsonResponseParser,
                &courier_core::JsonErrorParser,
            )
        );
        check!(err.message == SOMETHING_WENT_WRONG);
        check!(err.response_code == 503);
        check!(err.error == Value::String("upstream down".to_string()));
        check!(err.kind == ErrorKind::RemoteServer);
    }

    #[test]
    fn classify_other_statuses_are_ignored() {
        for status in [101, 302, 304, 600] {
            let mut target = Value::Null;
            let result = classify(
                status,
                "{}",
                Some(&mut target),
                &courier_core::JsonResponseParser,
                &courier_core::JsonErrorParser,
            );
            check!(result.is_ok());
            check!(target == Value::Null);
        }
    }
}
