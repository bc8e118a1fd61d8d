//! Client side of the remote policy gateway.
//!
//! `Gateway` is the contract the registry and the conversation depend on;
//! `HttpGateway` implements it over HTTP with reqwest. The wire types mirror
//! the backend's JSON and are mapped into core types at this boundary.

pub mod contract;
pub mod error;
pub mod http;

pub use contract::{Gateway, HealthStatus, PolicyRecord, PolicyUpload};
pub use error::GatewayError;
pub use http::HttpGateway;
