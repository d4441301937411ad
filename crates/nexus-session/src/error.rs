//! Error types for the session layer.

use nexus_context::StorageError;

/// Errors that can occur while persisting the session record.
///
/// These rarely escape this crate: the store logs them and degrades to
/// in-memory operation, per the subsystem's best-effort storage policy.
/// Decoding failures are not errors at all — a record that cannot be
/// parsed is treated as absent.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Serializing the record failed.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The cookie jar or shared storage rejected a write.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
