//! Media service trait and cache-invalidation seam.
//!
//! `MediaService` is implemented by the client crate on top of the
//! WebSocket transport. Keeping it a trait decouples the upload protocol
//! from the transport and makes it testable with mocks.

use std::future::Future;
use std::pin::Pin;

use mediashare_protocol::PostId;

use crate::error::ServiceError;

/// Boxed future returned by [`MediaService`] methods.
pub type ServiceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ServiceError>> + Send + 'a>>;

/// Remote operations consumed by the upload coordinator.
pub trait MediaService: Send + Sync {
    /// Sends one chunk. `Ok(false)` means the service refused it.
    ///
    /// Repeating a call for the same `(session_id, chunk_index)` must be
    /// harmless.
    fn upload_media_chunk<'a>(
        &'a self,
        session_id: PostId,
        total_size: u64,
        chunk_index: u64,
        data: &'a [u8],
    ) -> ServiceFuture<'a, bool>;

    /// Turns the accumulated chunks of a session into a post.
    fn finalize_upload(&self, session_id: PostId) -> ServiceFuture<'_, bool>;

    /// Drops partially uploaded chunk state for a session.
    fn delete_chunk(&self, session_id: PostId) -> ServiceFuture<'_, ()>;

    /// Returns `false` when the remote channel is not ready for calls.
    fn is_available(&self) -> bool {
        true
    }
}

/// Invalidates cached query results so later reads refetch.
pub trait CacheInvalidator: Send + Sync {
    /// Drops every cached entry whose key starts with `prefix`.
    fn invalidate(&self, prefix: &str);
}
