//! Client side of the media service.
//!
//! Provides the WebSocket transport, the `MediaService` implementation the
//! upload coordinator runs on, a query cache with prefix invalidation, and
//! feed paging.

pub mod cache;
pub mod feed;
mod pumps;
pub mod remote;
#[cfg(test)]
mod testing;
pub mod ws_client;

pub use cache::QueryCache;
pub use feed::{FeedPager, PostFeed};
pub use remote::RemoteMediaService;
pub use ws_client::{ClientError, WsClient};
