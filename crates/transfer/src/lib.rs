//! Chunk planning, byte sources, and per-upload bookkeeping.
//!
//! The [`ChunkPlan`] splitter only works on lengths; a [`ChunkSource`]
//! materializes the bytes of one range when it is about to be sent.

mod chunked;
mod session;
mod session_id;

pub use chunked::{ChunkIter, ChunkPlan, ChunkRange, ChunkSource, FileSource};
pub use session::{UploadSession, percent_complete};
pub use session_id::{SessionIdSource, TimeRandomIdSource};

/// Default chunk size: 512 KiB.
pub const DEFAULT_CHUNK_SIZE: usize = mediashare_protocol::constants::MEDIA_CHUNK_SIZE;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,

    #[error("range {start}..{end} out of bounds for source of {len} bytes")]
    RangeOutOfBounds { start: u64, end: u64, len: u64 },

    #[error("chunk {got} recorded out of order (expected {expected})")]
    OutOfOrder { expected: u64, got: u64 },
}
