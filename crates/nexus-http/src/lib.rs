//! HTTP client seam for Nexus Connect.
//!
//! The application makes its API calls through [`HttpClient`], a thin
//! wrapper over a pluggable [`HttpTransport`]. The client exists for one
//! reason: outgoing traffic is a proof of life. Background API calls
//! made by an open tab count as user presence, so the idle coordinator
//! attaches a [`NetworkActivityTap`] that signals on every request
//! leaving the client.
//!
//! The tap hooks traffic at two points, the interceptor chain and the
//! transport itself, so requests that bypass interceptors still count.
//! A request crossing both emits two signals; each one just re-anchors
//! the same deadline, so the duplication is benign.

mod client;
mod error;
mod tap;

pub use client::{HttpClient, HttpTransport, InterceptorId, RequestInterceptor};
pub use error::HttpError;
pub use tap::NetworkActivityTap;
