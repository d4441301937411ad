//! Error types for the context layer.

/// Errors that can occur when writing to shared storage or the cookie jar.
///
/// Reads never fail — missing or expired entries are simply absent. Writes
/// can fail the way browser storage does: quota exhaustion or storage
/// being disabled entirely. Callers are expected to treat these as
/// degraded-mode signals, not fatal errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The write was rejected (quota exceeded or simulated failure).
    #[error("storage write failed for key {0}")]
    WriteFailed(String),

    /// Storage is disabled for this origin.
    #[error("storage is disabled")]
    Disabled,
}
