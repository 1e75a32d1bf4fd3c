use serde::{Deserialize, Serialize};

use crate::constants::MessageType;
use crate::types::{Post, PostId, Principal, UserProfile, UserRole};

// ---------------------------------------------------------------------------
// Upload protocol
// ---------------------------------------------------------------------------

/// JSON header of a binary chunk frame.
///
/// The chunk bytes follow the header on the wire; the transport injects the
/// request `id` before sending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadChunkHeader {
    #[serde(rename = "type")]
    pub msg_type: MessageType,
    pub session_id: PostId,
    pub total_size: u64,
    pub chunk_index: u64,
}

impl UploadChunkHeader {
    pub fn new(session_id: PostId, total_size: u64, chunk_index: u64) -> Self {
        Self {
            msg_type: MessageType::UploadMediaChunk,
            session_id,
            total_size,
            chunk_index,
        }
    }
}

/// Converts the accumulated chunks of a session into a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeUploadRequest {
    pub session_id: PostId,
}

/// Drops partially uploaded chunk state for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteChunkRequest {
    pub session_id: PostId,
}

/// Generic boolean outcome (chunk accepted, upload finalized, post deleted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedPostsRequest {
    pub start: u64,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRequest {
    pub post_id: PostId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostsByAuthorRequest {
    pub author: Principal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostsResponse {
    #[serde(default)]
    pub posts: Vec<Post>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostResponse {
    pub post: Post,
}

// ---------------------------------------------------------------------------
// Profiles and roles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfileRequest {
    pub user: Principal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveProfileRequest {
    pub profile: UserProfile,
}

/// A profile lookup; `None` when the user never saved one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<UserProfile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleResponse {
    pub role: UserRole,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminResponse {
    pub is_admin: bool,
}

pub(crate) mod base64_bytes {
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        STANDARD.encode(data).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}
