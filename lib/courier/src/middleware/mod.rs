//! Tower middleware layers for the hyper transport.
//!
//! Layers wrap the transport service and see every built [`Request`] before
//! it hits the network. Add them with
//! [`HyperTransportBuilder::layer`](crate::HyperTransportBuilder::layer);
//! any `tower::Layer` over [`BoxedService`](crate::BoxedService) works.
//!
//! [`Request`]: courier_core::Request

mod logging;

pub use logging::{LogLevel, Logging, LoggingLayer};
