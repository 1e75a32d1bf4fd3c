use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Time to wait for a pong response (or any incoming message).
///
/// If nothing arrives within this window the connection is considered
/// dead. High enough to tolerate slow chunk processing on the service
/// side during large uploads.
pub const WS_PONG_WAIT: Duration = Duration::from_secs(60);

/// How often to send pings.
pub const WS_PING_PERIOD: Duration = Duration::from_secs(5);

/// Maximum message size in bytes (50 MB).
pub const WS_MAX_MESSAGE_SIZE: usize = 50 * 1024 * 1024;

/// Timeout for request/response operations (text messages).
pub const WS_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for binary request/response operations (chunk uploads).
pub const WS_BINARY_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Size of one media chunk: 512 KiB.
pub const MEDIA_CHUNK_SIZE: usize = 512 * 1024;

/// Query-cache key prefix for feed pages.
pub const CACHE_KEY_POSTS: &str = "posts";
/// Query-cache key prefix for single posts.
pub const CACHE_KEY_POST: &str = "post";
/// Query-cache key for the caller's profile.
pub const CACHE_KEY_CURRENT_PROFILE: &str = "currentUserProfile";

/// Remote operation identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    // Upload protocol
    #[serde(rename = "upload_media_chunk")]
    UploadMediaChunk,
    #[serde(rename = "finalize_upload")]
    FinalizeUpload,
    #[serde(rename = "delete_chunk")]
    DeleteChunk,

    // Posts
    #[serde(rename = "get_paginated_posts")]
    GetPaginatedPosts,
    #[serde(rename = "get_post")]
    GetPost,
    #[serde(rename = "get_posts_by_author")]
    GetPostsByAuthor,
    #[serde(rename = "delete_post")]
    DeletePost,

    // Profiles and roles
    #[serde(rename = "get_caller_user_profile")]
    GetCallerUserProfile,
    #[serde(rename = "save_caller_user_profile")]
    SaveCallerUserProfile,
    #[serde(rename = "get_user_profile")]
    GetUserProfile,
    #[serde(rename = "get_caller_user_role")]
    GetCallerUserRole,
    #[serde(rename = "is_caller_admin")]
    IsCallerAdmin,

    // Responses
    #[serde(rename = "chunk_accepted")]
    ChunkAccepted,
    #[serde(rename = "upload_finalized")]
    UploadFinalized,
    #[serde(rename = "posts_response")]
    PostsResponse,
    #[serde(rename = "post_response")]
    PostResponse,
    #[serde(rename = "profile_response")]
    ProfileResponse,
    #[serde(rename = "role_response")]
    RoleResponse,
    #[serde(rename = "operation_result")]
    OperationResult,
    #[serde(rename = "error")]
    Error,

    /// Forward compatibility: unknown message types deserialize here.
    #[serde(other)]
    Unknown,
}

/// Common error codes carried in [`crate::envelope::WsError`].
pub const WS_ERR_CODE_BAD_REQUEST: i32 = 400;
pub const WS_ERR_CODE_UNAUTHORIZED: i32 = 401;
pub const WS_ERR_CODE_NOT_FOUND: i32 = 404;
pub const WS_ERR_CODE_CONFLICT: i32 = 409;
pub const WS_ERR_CODE_INTERNAL: i32 = 500;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_type_serialization() {
        assert_eq!(
            serde_json::to_string(&MessageType::UploadMediaChunk).unwrap(),
            "\"upload_media_chunk\""
        );
        assert_eq!(
            serde_json::to_string(&MessageType::GetCallerUserProfile).unwrap(),
            "\"get_caller_user_profile\""
        );
    }

    #[test]
    fn message_type_deserialization() {
        let mt: MessageType = serde_json::from_str("\"finalize_upload\"").unwrap();
        assert_eq!(mt, MessageType::FinalizeUpload);
    }

    #[test]
    fn unknown_message_type() {
        let mt: MessageType = serde_json::from_str("\"some_future_type\"").unwrap();
        assert_eq!(mt, MessageType::Unknown);
    }

    #[test]
    fn chunk_size_is_512_kib() {
        assert_eq!(MEDIA_CHUNK_SIZE, 524_288);
    }
}
