//! Integration tests for `RestClient` over `HyperTransport` using wiremock.

use std::convert::Infallible;
use std::time::Duration;

use assert2::{check, let_assert};
use bytes::Bytes;
use courier::{
    Encoding, ErrorKind, HyperTransport, InMemoryFile, Method, MultipartBody, RequestContext,
    RestClient, SOMETHING_WENT_WRONG, TextResponseParser, TransportConfig,
};
use futures_util::stream;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, body_string, header, header_exists, method, path, query_param},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct NewUser {
    name: String,
}

#[derive(Debug, Default, PartialEq, Eq, Deserialize)]
struct Created {
    id: u64,
}

fn client_for(server: &MockServer) -> RestClient<HyperTransport> {
    RestClient::default_client().host(server.uri())
}

#[tokio::test]
async fn test_post_json_fills_target() {
    let mock_server = MockServer::start().await;
    let input = NewUser {
        name: "Ada".to_string(),
    };

    Mock::given(method("POST"))
        .and(path("/users"))
        .and(header("Content-Type", "application/json"))
        .and(header_exists("X-Request-ID"))
        .and(body_json(&input))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 7})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut created = Created::default();
    let result = client_for(&mock_server)
        .request()
        .body(&input)
        .expect("serializable")
        .response(&mut created)
        .post("/users")
        .await;

    check!(result.is_ok());
    check!(created == Created { id: 7 });
}

#[tokio::test]
async fn test_get_not_found_uses_error_envelope() {
    let mock_server = MockServer::start().await;
    let body = json!({"message": "not found", "response_code": 404});

    Mock::given(method("GET"))
        .and(path("/users/9"))
        .respond_with(ResponseTemplate::new(404).set_body_json(&body))
        .mount(&mock_server)
        .await;

    let mut target = Value::Null;
    let err = client_for(&mock_server)
        .request()
        .response(&mut target)
        .get("/users/9")
        .await
        .expect_err("404");

    check!(err.response_code == 404);
    check!(err.message == "not found");
    check!(err.kind == ErrorKind::RemoteClient);
    check!(target == Value::Null);
}

#[tokio::test]
async fn test_client_error_with_unparseable_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(409).set_body_string("conflict"))
        .mount(&mock_server)
        .await;

    let err = client_for(&mock_server)
        .request()
        .delete("/users/1")
        .await
        .expect_err("409");

    check!(err.response_code == 409);
    check!(err.message == SOMETHING_WENT_WRONG);
    check!(err.error == Value::String("conflict".to_string()));
}

#[tokio::test]
async fn test_server_error_has_fixed_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/users/1"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({"message": "db down"})),
        )
        .mount(&mock_server)
        .await;

    let err = client_for(&mock_server)
        .request()
        .json_value(json!({"name": "Ada"}))
        .put("/users/1")
        .await
        .expect_err("503");

    check!(err.response_code == 503);
    check!(err.message == SOMETHING_WENT_WRONG);
    check!(err.kind == ErrorKind::RemoteServer);
    let_assert!(Value::String(raw) = &err.error);
    check!(raw.contains("db down"));
}

#[tokio::test]
async fn test_success_without_target_ignores_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .mount(&mock_server)
        .await;

    let result = client_for(&mock_server)
        .request()
        .patch("/users/1")
        .await;
    check!(result.is_ok());
}

#[tokio::test]
async fn test_multipart_upload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(header(
            "Content-Type",
            "multipart/form-data; boundary=test-boundary",
        ))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let parts = MultipartBody::with_boundary("test-boundary")
        .add("title", "Q3 \"draft\"")
        .add_json("meta", json!({"pages": 3}))
        .add_file("report", InMemoryFile::new("report.csv", "a,b\n1,2\n"));

    let result = client_for(&mock_server)
        .request()
        .multipart(parts)
        .post("/upload")
        .await;
    check!(result.is_ok());

    let requests = mock_server.received_requests().await.expect("recording");
    let_assert!([request] = requests.as_slice());
    let content_type = request
        .headers
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .expect("content type");
    let boundary = multer::parse_boundary(content_type).expect("boundary");
    let body = Bytes::from(request.body.clone());
    let stream = stream::once(async move { Ok::<_, Infallible>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let_assert!(Ok(Some(title)) = multipart.next_field().await);
    check!(title.name() == Some("title"));
    check!(title.file_name().is_none());
    check!(title.content_type().is_none());
    check!(title.text().await.expect("text") == "Q3 \"draft\"");

    let_assert!(Ok(Some(meta)) = multipart.next_field().await);
    check!(meta.name() == Some("meta"));
    check!(meta.content_type().map(ToString::to_string) == Some("application/json".to_string()));
    let meta: Value = serde_json::from_str(&meta.text().await.expect("text")).expect("json");
    check!(meta == json!({"pages": 3}));

    let_assert!(Ok(Some(report)) = multipart.next_field().await);
    check!(report.name() == Some("report"));
    check!(report.file_name() == Some("report.csv"));
    check!(report.content_type().map(ToString::to_string) == Some("text/csv".to_string()));
    check!(report.bytes().await.expect("bytes").as_ref() == b"a,b\n1,2\n");

    let_assert!(Ok(None) = multipart.next_field().await);
}

#[tokio::test]
async fn test_form_urlencoded_post() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(header("Content-Type", "application/x-www-form-urlencoded"))
        .and(body_string("client_id=abc&grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "t"})))
        .mount(&mock_server)
        .await;

    let mut token = Value::Null;
    client_for(&mock_server)
        .request()
        .form([("grant_type", "client_credentials"), ("client_id", "abc")])
        .encoding(Encoding::FormUrlEncoded)
        .response(&mut token)
        .post("/oauth/token")
        .await
        .expect("token");

    check!(token == json!({"token": "t"}));
}

#[tokio::test]
async fn test_headers_and_query_parameters() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "rust lang"))
        .and(query_param("page", "1"))
        .and(header("Authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["courier"])))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server).header("Authorization", "Bearer secret");
    let mut results: Vec<String> = Vec::new();
    client
        .request()
        .param("q", "rust lang")
        .params([("page", "1")])
        .response(&mut results)
        .get("/search")
        .await
        .expect("results");

    check!(results == ["courier"]);
}

#[tokio::test]
async fn test_request_ids_are_unique() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    client.request().get("/a").await.expect("first");
    client.request().get("/b").await.expect("second");

    let requests = mock_server.received_requests().await.expect("recording");
    let ids: Vec<_> = requests
        .iter()
        .filter_map(|r| r.headers.get("x-request-id"))
        .collect();
    let_assert!([first, second] = ids.as_slice());
    check!(first != second);
    check!(first.len() == 36);
}

#[tokio::test]
async fn test_text_parser_and_exchange() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&mock_server)
        .await;

    let mut text = String::new();
    let data = client_for(&mock_server)
        .request()
        .parser(TextResponseParser)
        .response(&mut text)
        .exchange(Method::Get, "/health")
        .await;

    check!(data.is_success());
    check!(data.response_code == Some(200));
    check!(data.response == "OK");
    check!(text == "OK");
}

#[tokio::test]
async fn test_custom_error_parser() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(422).set_body_string("name: too short"))
        .mount(&mock_server)
        .await;

    let err = client_for(&mock_server)
        .error_parser(|body: &str| courier::ErrorDetails::generic(body, Value::Null, 400))
        .request()
        .get("/validate")
        .await
        .expect_err("422");

    check!(err.message == "name: too short");
    check!(err.response_code == 422);
}

#[tokio::test]
async fn test_connection_refused() {
    // nothing listens on port 1
    let client = RestClient::default_client().host("http://127.0.0.1:1");

    let err = client.request().get("/users").await.expect_err("refused");

    check!(err.response_code == 500);
    check!(err.kind == ErrorKind::Transport);
    check!(err.message.starts_with("connection error"));
    check!(err.error == Value::String(SOMETHING_WENT_WRONG.to_string()));
}

#[tokio::test]
async fn test_transport_timeout_caps_a_longer_deadline() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&mock_server)
        .await;

    let config = TransportConfig::builder()
        .timeout(Duration::from_millis(200))
        .build();
    let client = RestClient::with_config(config).host(mock_server.uri());

    let err = client
        .request()
        .context(RequestContext::new().with_timeout(Duration::from_secs(60)))
        .get("/slow")
        .await
        .expect_err("transport timeout");

    check!(err.kind == ErrorKind::Transport);
    check!(err.message == "request timeout");
}
