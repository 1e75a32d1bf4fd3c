//! Chunked media upload flow.
//!
//! This crate holds the upload **business logic** and has no transport
//! dependency. The client crate provides a `MediaService` implementation
//! that talks to the media service over WebSocket.
//!
//! # Pipeline
//!
//! 1. **Split** the source into 512 KiB ranges
//! 2. **Transmit** each chunk in order, retrying transient failures
//! 3. **Finalize** the session into a post
//!
//! A cancelled upload asks the service to drop the chunks it already
//! received.

pub mod coordinator;
pub mod error;
pub mod service;
pub mod types;

pub use coordinator::UploadCoordinator;
pub use error::{ServiceError, UploadError};
pub use service::{CacheInvalidator, MediaService, ServiceFuture};
pub use types::{RetryPolicy, UploadConfig, UploadEvent, UploadReceipt, UploadState};
