//! Fluent request configuration.
//!
//! [`RestClient`] holds the transport and the defaults shared by every call;
//! [`RestClient::request`] hands out a [`RequestBuilder`] that is configured
//! by chaining and dispatched by one of the verb methods.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use courier_core::{
    Encoding, ErrorDetails, ErrorParser, JsonErrorParser, JsonResponseParser, Method,
    MultipartBody, ResponseData, ResponseParser, ResponseTarget, Transport,
};
use serde::Serialize;
use serde_json::Value;

use crate::{HyperTransport, RequestContext, TransportConfig, dispatch};

/// Request payload, serialized according to the [`Encoding`] at dispatch time.
#[derive(Debug, Default)]
pub enum Body {
    /// No payload.
    #[default]
    Empty,
    /// A structured value.
    Json(Value),
    /// Ordered multipart parts.
    Multipart(MultipartBody),
    /// Flat string fields.
    Form(BTreeMap<String, String>),
    /// A plain string, sent as a JSON string.
    Raw(String),
}

impl Body {
    /// Short name of the variant, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Json(_) => "json",
            Self::Multipart(_) => "multipart",
            Self::Form(_) => "form",
            Self::Raw(_) => "raw string",
        }
    }
}

/// Defaults every request starts from.
#[derive(Clone)]
pub(crate) struct Template {
    pub(crate) host: String,
    pub(crate) headers: BTreeMap<String, String>,
    pub(crate) params: BTreeMap<String, String>,
    pub(crate) encoding: Encoding,
    pub(crate) parser: Arc<dyn ResponseParser>,
    pub(crate) error_parser: Arc<dyn ErrorParser>,
}

impl Default for Template {
    fn default() -> Self {
        Self {
            host: String::new(),
            headers: BTreeMap::new(),
            params: BTreeMap::new(),
            encoding: Encoding::default(),
            parser: Arc::new(JsonResponseParser),
            error_parser: Arc::new(JsonErrorParser),
        }
    }
}

/// Everything one dispatch needs, apart from the response target.
pub(crate) struct RequestConfig {
    pub(crate) template: Template,
    pub(crate) body: Body,
    pub(crate) context: Option<RequestContext>,
}

/// Shared entry point: a transport plus request defaults.
///
/// Cheap to clone. Each [`request`](Self::request) starts from a copy of the
/// defaults, so concurrent callers never see each other's settings.
///
/// ```no_run
/// use courier::RestClient;
///
/// # async fn run() -> Result<(), courier::ErrorDetails> {
/// let client = RestClient::default_client()
///     .host("https://api.example.com")
///     .header("Accept", "application/json");
///
/// let mut users = serde_json::Value::Null;
/// client.request().response(&mut users).get("/users").await?;
/// # Ok(())
/// # }
/// ```
pub struct RestClient<T = HyperTransport> {
    transport: Arc<T>,
    template: Template,
}

impl<T> Clone for RestClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            template: self.template.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for RestClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("transport", &self.transport)
            .field("host", &self.template.host)
            .field("encoding", &self.template.encoding)
            .finish_non_exhaustive()
    }
}

impl RestClient<HyperTransport> {
    /// Client over a hyper transport with the default configuration.
    #[must_use]
    pub fn default_client() -> Self {
        Self::new(HyperTransport::new())
    }

    /// Client over a hyper transport with a custom configuration.
    #[must_use]
    pub fn with_config(config: TransportConfig) -> Self {
        Self::new(HyperTransport::with_config(config))
    }
}

impl<T: Transport> RestClient<T> {
    /// Client over the given transport.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self::from_shared(Arc::new(transport))
    }

    /// Client over an already shared transport.
    #[must_use]
    pub fn from_shared(transport: Arc<T>) -> Self {
        Self {
            transport,
            template: Template::default(),
        }
    }

    /// The underlying transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Default base URL.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.template.host = host.into();
        self
    }

    /// Default header, sent with every request.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.template.headers.insert(name.into(), value.into());
        self
    }

    /// Default query parameter, sent with every request.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.template.params.insert(name.into(), value.into());
        self
    }

    /// Default encoding mode.
    #[must_use]
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.template.encoding = encoding;
        self
    }

    /// Default success-body parser.
    #[must_use]
    pub fn parser(mut self, parser: impl ResponseParser + 'static) -> Self {
        self.template.parser = Arc::new(parser);
        self
    }

    /// Default client-error-body parser.
    #[must_use]
    pub fn error_parser(mut self, parser: impl ErrorParser + 'static) -> Self {
        self.template.error_parser = Arc::new(parser);
        self
    }

    /// Start a request from the defaults.
    #[must_use]
    pub fn request(&self) -> RequestBuilder<'static, T> {
        RequestBuilder {
            transport: Arc::clone(&self.transport),
            config: RequestConfig {
                template: self.template.clone(),
                body: Body::Empty,
                context: None,
            },
            target: None,
        }
    }
}

/// One request being configured.
///
/// Every method consumes the builder and returns it with one setting
/// changed. Nothing touches the network until a verb is awaited.
#[must_use = "a request does nothing until a verb is awaited"]
pub struct RequestBuilder<'t, T> {
    transport: Arc<T>,
    config: RequestConfig,
    target: Option<&'t mut dyn ResponseTarget>,
}

impl<T> fmt::Debug for RequestBuilder<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("host", &self.config.template.host)
            .field("headers", &self.config.template.headers)
            .field("params", &self.config.template.params)
            .field("body", &self.config.body)
            .field("encoding", &self.config.template.encoding)
            .field("has_target", &self.target.is_some())
            .finish_non_exhaustive()
    }
}

impl<'t, T: Transport> RequestBuilder<'t, T> {
    /// Base URL the endpoint is appended to.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.template.host = host.into();
        self
    }

    /// Set a header. A later call with the same name wins.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config
            .template
            .headers
            .insert(name.into(), value.into());
        self
    }

    /// Set several headers.
    pub fn headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.config
            .template
            .headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set a query parameter. A later call with the same name wins.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config
            .template
            .params
            .insert(name.into(), value.into());
        self
    }

    /// Set several query parameters.
    pub fn params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.config
            .template
            .params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Serialize `value` as the request body.
    ///
    /// # Errors
    ///
    /// Returns a construction error if `value` cannot be represented as JSON.
    pub fn body<B: Serialize + ?Sized>(self, value: &B) -> Result<Self, ErrorDetails> {
        let value = serde_json::to_value(value).map_err(|e| {
            ErrorDetails::construction(format!("JSON serialization error: {e}"))
        })?;
        Ok(self.json_value(value))
    }

    /// Use an already built JSON value as the body.
    pub fn json_value(mut self, value: Value) -> Self {
        self.config.body = Body::Json(value);
        self
    }

    /// Use flat string fields as the body.
    ///
    /// The usual body for [`Encoding::FormUrlEncoded`].
    pub fn form<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let fields = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.config.body = Body::Form(fields);
        self
    }

    /// Use a plain string as the body.
    pub fn raw_body(mut self, body: impl Into<String>) -> Self {
        self.config.body = Body::Raw(body.into());
        self
    }

    /// Use a multipart body and switch to [`Encoding::Multipart`].
    pub fn multipart(mut self, body: MultipartBody) -> Self {
        self.config.body = Body::Multipart(body);
        self.config.template.encoding = Encoding::Multipart;
        self
    }

    /// Set the encoding mode.
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.config.template.encoding = encoding;
        self
    }

    /// Decode a successful response into `target`.
    pub fn response<'u>(self, target: &'u mut dyn ResponseTarget) -> RequestBuilder<'u, T> {
        RequestBuilder {
            transport: self.transport,
            config: self.config,
            target: Some(target),
        }
    }

    /// Replace the success-body parser for this request.
    pub fn parser(mut self, parser: impl ResponseParser + 'static) -> Self {
        self.config.template.parser = Arc::new(parser);
        self
    }

    /// Replace the client-error-body parser for this request.
    pub fn error_parser(mut self, parser: impl ErrorParser + 'static) -> Self {
        self.config.template.error_parser = Arc::new(parser);
        self
    }

    /// Attach a cancellation and deadline signal.
    pub fn context(mut self, context: RequestContext) -> Self {
        self.config.context = Some(context);
        self
    }

    /// Dispatch as `GET`.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn get(self, endpoint: &str) -> Result<(), ErrorDetails> {
        self.send(Method::Get, endpoint).await
    }

    /// Dispatch as `POST`.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn post(self, endpoint: &str) -> Result<(), ErrorDetails> {
        self.send(Method::Post, endpoint).await
    }

    /// Dispatch as `PUT`.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn put(self, endpoint: &str) -> Result<(), ErrorDetails> {
        self.send(Method::Put, endpoint).await
    }

    /// Dispatch as `PATCH`.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn patch(self, endpoint: &str) -> Result<(), ErrorDetails> {
        self.send(Method::Patch, endpoint).await
    }

    /// Dispatch as `DELETE`.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn delete(self, endpoint: &str) -> Result<(), ErrorDetails> {
        self.send(Method::Delete, endpoint).await
    }

    /// Dispatch with an arbitrary method.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorDetails`] when the body cannot be encoded for the
    /// chosen mode, the URL or headers are invalid, the transport fails, the
    /// server answers 4xx or 5xx, or a 2xx body cannot be parsed.
    pub async fn send(self, method: Method, endpoint: &str) -> Result<(), ErrorDetails> {
        self.exchange(method, endpoint)
            .await
            .into_result()
            .map(drop)
    }

    /// Dispatch and return the status, error and raw body together.
    pub async fn exchange(self, method: Method, endpoint: &str) -> ResponseData {
        dispatch::dispatch(
            self.transport.as_ref(),
            self.config,
            self.target,
            method,
            endpoint,
        )
        .await
    }
}
