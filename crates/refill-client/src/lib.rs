//! Backend client trait and HTTP implementation for the refill orchestrator.
//!
//! Provides the `BackendClient` seam the orchestrator calls through, and
//! `HttpBackend`, the reqwest implementation against the remote analytics
//! workspace API.

mod backend;
mod http;

pub use backend::{BackendClient, PopulateOptions};
pub use http::HttpBackend;
