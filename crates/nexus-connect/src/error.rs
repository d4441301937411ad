//! Top-level error type.

/// Everything that can go wrong at the coordinator boundary.
///
/// Most internal failures never reach this type: storage and broadcast
/// problems are logged and degraded around, because an idle timer that
/// crashes on a full localStorage would be worse than one that merely
/// loses cross-tab sync. What remains is lifecycle plumbing.
#[derive(Debug, thiserror::Error)]
pub enum NexusError {
    /// The coordinator task is gone; its command channel is closed.
    #[error("idle coordinator is not running")]
    CoordinatorClosed,

    #[error(transparent)]
    Session(#[from] nexus_session::SessionError),

    #[error(transparent)]
    Storage(#[from] nexus_context::StorageError),

    #[error(transparent)]
    Http(#[from] nexus_http::HttpError),
}
