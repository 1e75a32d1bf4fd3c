//! Wire protocol types for client-to-service communication.

pub mod constants;
pub mod envelope;
pub mod messages;
pub mod types;

// Re-export primary types for convenience.
pub use constants::MessageType;
pub use envelope::{Message, WsError};
pub use types::{Post, PostId, Principal, UserProfile, UserRole};
