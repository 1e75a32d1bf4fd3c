//! Upload error types.

use mediashare_protocol::PostId;

/// Errors returned by a [`crate::MediaService`] call.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("media service unavailable")]
    Unavailable,

    #[error("request timed out")]
    Timeout,

    #[error("connection closed")]
    Closed,

    #[error("service error {code}: {message}")]
    Remote { code: i32, message: String },

    #[error("rejected by service: {0}")]
    Rejected(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ServiceError {
    /// Whether another attempt of the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ServiceError::Unavailable)
    }
}

/// Outcome of a failed or cancelled upload.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("media service unavailable")]
    ServiceUnavailable,

    #[error("an upload is already in progress")]
    AlreadyUploading,

    #[error("upload cancelled")]
    Cancelled { session_id: PostId },

    #[error("chunk {index} failed after {attempts} attempts: {source}")]
    ChunkUploadFailed {
        index: u64,
        attempts: u32,
        #[source]
        source: ServiceError,
    },

    #[error("finalize failed for upload {session_id}: {reason}")]
    FinalizeFailed { session_id: PostId, reason: String },

    /// Local read failure, including a reader task that panicked.
    #[error("transfer error: {0}")]
    Transfer(#[from] mediashare_transfer::TransferError),
}

impl UploadError {
    /// Cancellation is reported to callers as an outcome, not a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, UploadError::Cancelled { .. })
    }
}
