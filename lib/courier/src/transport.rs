//! HTTP transport implementation using hyper-util.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use courier_core::{Request, Response, Transport, TransportError};
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use tower::util::BoxCloneSyncService;
use tower::{Layer, ServiceExt};
use tower_service::Service;

use crate::{
    config::{TransportConfig, TransportConfigBuilder},
    connector::https_connector,
    middleware::LoggingLayer,
};

/// Type-erased service for middleware composition.
pub type BoxedService = BoxCloneSyncService<Request, Response, TransportError>;

/// Future type for Tower Service implementation.
pub type ServiceFuture =
    Pin<Box<dyn Future<Output = Result<Response, TransportError>> + Send + 'static>>;

type LayerFn = Arc<dyn Fn(BoxedService) -> BoxedService + Send + Sync>;

// ============================================================================
// Raw Transport
// ============================================================================

#[derive(Clone)]
struct RawHyperTransport {
    inner: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    config: TransportConfig,
}

impl RawHyperTransport {
    fn new(config: TransportConfig) -> Self {
        let connector = https_connector(config.connect_timeout);

        let inner = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .build(connector);

        Self { inner, config }
    }

    fn build_hyper_request(request: Request) -> Result<http::Request<Full<Bytes>>, TransportError> {
        let (method, url, headers, body) = request.into_parts();

        let mut http_request = http::Request::builder()
            .method(http::Method::from(method))
            .uri(url.as_str())
            .body(Full::new(body))
            .map_err(|e| TransportError::invalid_request(e.to_string()))?;
        *http_request.headers_mut() = headers;

        Ok(http_request)
    }

    /// Response headers as a `HashMap`; repeated names keep the last value.
    fn extract_headers(headers: &http::HeaderMap) -> HashMap<String, String> {
        headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect()
    }

    async fn execute(&self, request: Request) -> Result<Response, TransportError> {
        let hyper_request = Self::build_hyper_request(request)?;

        let exchange = async {
            let response = self
                .inner
                .request(hyper_request)
                .await
                .map_err(Self::map_hyper_error)?;

            let status = response.status().as_u16();
            let response_headers = Self::extract_headers(response.headers());

            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| TransportError::connection(e.to_string()))?
                .to_bytes();

            Ok(Response::new(status, response_headers, body))
        };

        tokio::time::timeout(self.config.timeout, exchange)
            .await
            .map_err(|_| TransportError::Timeout)?
    }

    #[allow(clippy::needless_pass_by_value)]
    fn map_hyper_error(err: hyper_util::client::legacy::Error) -> TransportError {
        // the legacy client only exposes the root cause through the source chain
        let mut msg = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            msg = format!("{msg}: {cause}");
            source = cause.source();
        }

        if err.is_connect() {
            return TransportError::connection(msg);
        }

        let lower = msg.to_lowercase();
        if lower.contains("ssl") || lower.contains("tls") || lower.contains("certificate") {
            return TransportError::tls(msg);
        }

        TransportError::connection(msg)
    }
}

impl Service<Request> for RawHyperTransport {
    type Response = Response;
    type Error = TransportError;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), TransportError>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let transport = self.clone();
        Box::pin(async move { transport.execute(request).await })
    }
}

// ============================================================================
// Public Transport
// ============================================================================

/// Transport using hyper-util with connection pooling, TLS, and middleware support.
///
/// Cloning is cheap and clones share the connection pool.
///
/// ```no_run
/// use std::time::Duration;
/// use courier::HyperTransport;
///
/// let transport = HyperTransport::builder()
///     .timeout(Duration::from_secs(30))
///     .with_logging()
///     .build();
/// ```
#[derive(Clone)]
pub struct HyperTransport {
    service: BoxedService,
    config: TransportConfig,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    /// Create a new transport with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(TransportConfig::default())
    }

    /// Create a new transport with custom configuration (no middleware).
    #[must_use]
    pub fn with_config(config: TransportConfig) -> Self {
        let raw = RawHyperTransport::new(config.clone());
        Self {
            service: BoxCloneSyncService::new(raw),
            config,
        }
    }

    /// Create a new transport builder.
    #[must_use]
    pub fn builder() -> HyperTransportBuilder {
        HyperTransportBuilder::default()
    }

    /// Get the transport configuration.
    #[must_use]
    pub const fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HyperTransport {
    fn execute(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<Response, TransportError>> + Send {
        self.service.clone().oneshot(request)
    }
}

impl Service<Request> for HyperTransport {
    type Response = Response;
    type Error = TransportError;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), TransportError>> {
        self.service.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        self.service.call(request)
    }
}

/// Builder for [`HyperTransport`].
#[derive(Default)]
pub struct HyperTransportBuilder {
    config: TransportConfigBuilder,
    layers: Vec<LayerFn>,
}

impl std::fmt::Debug for HyperTransportBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransportBuilder")
            .field("config", &self.config)
            .field("layers_count", &self.layers.len())
            .finish()
    }
}

impl HyperTransportBuilder {
    /// Set the whole-call timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.timeout(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.connect_timeout(timeout);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.config = self.config.pool_idle_per_host(count);
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.pool_idle_timeout(timeout);
        self
    }

    /// Add a Tower layer to the transport.
    ///
    /// Layers are applied in order: first added = innermost.
    #[must_use]
    pub fn layer<L>(mut self, layer: L) -> Self
    where
        L: Layer<BoxedService> + Send + Sync + 'static,
        L::Service: Service<Request, Response = Response, Error = TransportError>
            + Clone
            + Send
            + Sync
            + 'static,
        <L::Service as Service<Request>>::Future: Send + 'static,
    {
        self.layers.push(Arc::new(move |service| {
            BoxCloneSyncService::new(layer.layer(service))
        }));
        self
    }

    /// Add request/response logging.
    #[must_use]
    pub fn with_logging(self) -> Self {
        self.layer(LoggingLayer::new())
    }

    /// Add debug-level logging (includes headers).
    #[must_use]
    pub fn with_debug_logging(self) -> Self {
        self.layer(LoggingLayer::debug())
    }

    /// Build the transport with all configured middleware.
    #[must_use]
    pub fn build(self) -> HyperTransport {
        let config = self.config.build();
        let mut service: BoxedService =
            BoxCloneSyncService::new(RawHyperTransport::new(config.clone()));

        for layer_fn in self.layers {
            service = layer_fn(service);
        }

        HyperTransport { service, config }
    }
}

#[cfg(test)]
mod tests {
    use assert2::check;
    use courier_core::Method;

    use super::*;

    #[test]
    fn transport_default() {
        let transport = HyperTransport::new();
        check!(transport.config().timeout == Duration::from_secs(100));
    }

    #[test]
    fn transport_builder() {
        let transport = HyperTransport::builder()
            .timeout(Duration::from_secs(60))
            .pool_idle_per_host(16)
            .with_logging()
            .build();

        check!(transport.config().timeout == Duration::from_secs(60));
        check!(transport.config().pool_idle_per_host == 16);
    }

    #[test]
    fn transport_is_debug() {
        let debug = format!("{:?}", HyperTransport::new());
        check!(debug.contains("HyperTransport"));
    }

    #[test]
    fn hyper_request_keeps_headers_and_body() {
        let url = url::Url::parse("http://localhost/users?page=2").expect("url");
        let mut request = Request::new(Method::Post, url).with_body(Bytes::from_static(b"{}"));
        request
            .headers_mut()
            .append("x-tag", http::HeaderValue::from_static("a"));
        request
            .headers_mut()
            .append("x-tag", http::HeaderValue::from_static("b"));

        let hyper_request = RawHyperTransport::build_hyper_request(request).expect("request");
        check!(hyper_request.method() == http::Method::POST);
        check!(hyper_request.uri() == "http://localhost/users?page=2");
        check!(hyper_request.headers().get_all("x-tag").iter().count() == 2);
    }

    #[tokio::test]
    async fn connection_refused_is_connection_error() {
        let transport = HyperTransport::builder()
            .connect_timeout(Duration::from_secs(2))
            .build();
        let url = url::Url::parse("http://127.0.0.1:1/").expect("url");

        let err = transport
            .execute(Request::new(Method::Get, url))
            .await
            .expect_err("nothing listens on port 1");
        check!(matches!(err, TransportError::Connection(_)));
    }
}
