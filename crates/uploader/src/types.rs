//! Data types for the upload flow.

use std::time::Duration;

use mediashare_protocol::PostId;
use serde::{Deserialize, Serialize};

/// Fixed-interval retry policy for chunk transmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts per chunk, including the first one.
    pub max_attempts: u32,
    /// Pause between a failed attempt and the next one.
    #[serde(with = "duration_millis")]
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Attempts actually made; a policy of 0 still sends once.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Settings for an [`crate::UploadCoordinator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadConfig {
    pub chunk_size: usize,
    pub retry: RetryPolicy,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size: mediashare_transfer::DEFAULT_CHUNK_SIZE,
            retry: RetryPolicy::default(),
        }
    }
}

/// Where an upload currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    Splitting,
    Transmitting { chunk_index: u64 },
    Finalizing,
    Done,
    CleaningUp,
    Aborted,
    Failed,
}

impl UploadState {
    /// Returns `true` for `Done`, `Aborted` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UploadState::Done | UploadState::Aborted | UploadState::Failed
        )
    }
}

/// Event emitted while an upload runs.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    StateChanged(UploadState),
    /// A chunk was confirmed.
    Progress {
        session_id: PostId,
        chunk_index: u64,
        percent: u8,
        uploaded_bytes: u64,
        total_bytes: u64,
    },
    /// A chunk attempt failed and will be retried.
    Retrying {
        session_id: PostId,
        chunk_index: u64,
        attempt: u32,
        error: String,
    },
    /// Best-effort cleanup after cancellation failed. Diagnostic only.
    CleanupFailed { session_id: PostId, error: String },
    Completed { session_id: PostId },
    Cancelled { session_id: PostId },
    Failed { session_id: Option<PostId>, error: String },
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// Id the service now knows the post by.
    pub post_id: PostId,
    pub total_bytes: u64,
    pub chunks: u64,
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_contract() {
        let config = UploadConfig::default();
        assert_eq!(config.chunk_size, 512 * 1024);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.backoff, Duration::from_secs(1));
    }

    #[test]
    fn zero_attempts_still_sends_once() {
        let policy = RetryPolicy {
            max_attempts: 0,
            backoff: Duration::ZERO,
        };
        assert_eq!(policy.attempts(), 1);
    }

    #[test]
    fn retry_policy_json_uses_millis() {
        let json = serde_json::to_value(RetryPolicy::default()).unwrap();
        assert_eq!(json["backoff"], 1000);
        let parsed: RetryPolicy =
            serde_json::from_str(r#"{"max_attempts":5,"backoff":250}"#).unwrap();
        assert_eq!(parsed.backoff, Duration::from_millis(250));
    }

    #[test]
    fn terminal_states() {
        assert!(UploadState::Done.is_terminal());
        assert!(UploadState::Aborted.is_terminal());
        assert!(!UploadState::Transmitting { chunk_index: 0 }.is_terminal());
    }
}
