use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a post (and of the upload session that produces it).
pub type PostId = u64;

/// Opaque textual identity of a user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A published media post.
///
/// `media` is base64-encoded in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    #[serde(with = "crate::messages::base64_bytes")]
    pub media: Vec<u8>,
    pub author: Principal,
    pub is_finalized: bool,
}

/// Public profile of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
}

/// Access role assigned to a caller by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
    Guest,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UserRole::Admin => "admin",
            UserRole::User => "user",
            UserRole::Guest => "guest",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_json_uses_camel_case_and_base64() {
        let post = Post {
            id: 1_700_000_000_000_123,
            media: b"GIF89a".to_vec(),
            author: Principal::new("2vxsx-fae"),
            is_finalized: false,
        };
        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["isFinalized"], false);
        assert_eq!(json["media"], "R0lGODlh");
        assert_eq!(json["author"], "2vxsx-fae");
        assert_eq!(json["id"], 1_700_000_000_000_123u64);
    }

    #[test]
    fn user_role_wire_names() {
        assert_eq!(serde_json::to_string(&UserRole::Admin).unwrap(), "\"admin\"");
        let role: UserRole = serde_json::from_str("\"guest\"").unwrap();
        assert_eq!(role, UserRole::Guest);
        assert_eq!(UserRole::User.to_string(), "user");
    }
}
