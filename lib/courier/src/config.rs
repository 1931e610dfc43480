//! Settings for the hyper transport.
//!
//! The transport timeout bounds one whole exchange: connecting, sending the
//! request and reading the full response body. A [`RequestContext`] attached
//! to a request can only shorten that bound, never extend it: whichever of
//! the transport timeout and the context deadline fires first aborts the call,
//! and both surface as a `"request timeout"` transport error.
//!
//! [`RequestContext`]: crate::RequestContext

use std::time::Duration;

/// Whole-exchange timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(100);

/// TCP connect timeout used when none is configured.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for [`HyperTransport`](crate::HyperTransport).
///
/// ```
/// use std::time::Duration;
/// use courier::TransportConfig;
///
/// let config = TransportConfig::builder()
///     .timeout(Duration::from_secs(15))
///     .build();
/// assert_eq!(config.connect_timeout, courier::DEFAULT_CONNECT_TIMEOUT);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Upper bound for one exchange, response body included.
    pub timeout: Duration,
    /// Upper bound for establishing the TCP connection.
    pub connect_timeout: Duration,
    /// Idle pooled connections kept per host.
    pub pool_idle_per_host: usize,
    /// How long a pooled connection may stay idle before it is closed.
    pub pool_idle_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            pool_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
        }
    }
}

impl TransportConfig {
    /// Start from the defaults.
    #[must_use]
    pub fn builder() -> TransportConfigBuilder {
        TransportConfigBuilder::default()
    }

    /// Start from this configuration, to derive a variant of it.
    #[must_use]
    pub fn to_builder(&self) -> TransportConfigBuilder {
        TransportConfigBuilder::from(self.clone())
    }
}

/// Builder for [`TransportConfig`], seeded with the defaults.
#[derive(Debug, Clone, Default)]
pub struct TransportConfigBuilder {
    config: TransportConfig,
}

impl From<TransportConfig> for TransportConfigBuilder {
    fn from(config: TransportConfig) -> Self {
        Self { config }
    }
}

impl TransportConfigBuilder {
    /// Bound for a whole exchange.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Bound for the TCP connect.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Idle pooled connections kept per host; `0` disables pooling.
    #[must_use]
    pub fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.config.pool_idle_per_host = count;
        self
    }

    /// Idle lifetime of a pooled connection.
    #[must_use]
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.pool_idle_timeout = timeout;
        self
    }

    /// Finish.
    #[must_use]
    pub fn build(self) -> TransportConfig {
        self.config
    }
}
