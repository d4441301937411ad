//! Error type for the HTTP seam.

/// Errors surfaced by [`HttpClient::send`](crate::HttpClient::send).
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// The underlying transport failed to complete the exchange.
    #[error("transport error: {0}")]
    Transport(String),

    /// A request or response could not be constructed.
    #[error(transparent)]
    Protocol(#[from] http::Error),
}
