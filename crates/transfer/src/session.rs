use mediashare_protocol::PostId;

use crate::TransferError;
use crate::chunked::{ChunkPlan, ChunkRange};

/// Bookkeeping for one upload attempt.
///
/// Owned by a single upload task; chunks must be recorded strictly in plan
/// order.
#[derive(Debug, Clone)]
pub struct UploadSession {
    id: PostId,
    plan: ChunkPlan,
    uploaded_bytes: u64,
    next_index: u64,
}

impl UploadSession {
    /// Creates a session over `total_size` bytes split into `chunk_size` chunks.
    pub fn new(id: PostId, total_size: u64, chunk_size: usize) -> Result<Self, TransferError> {
        Ok(Self {
            id,
            plan: ChunkPlan::split(total_size, chunk_size)?,
            uploaded_bytes: 0,
            next_index: 0,
        })
    }

    /// Records a confirmed chunk and advances the byte counter.
    pub fn record_chunk(&mut self, range: &ChunkRange) -> Result<(), TransferError> {
        if range.index != self.next_index {
            return Err(TransferError::OutOfOrder {
                expected: self.next_index,
                got: range.index,
            });
        }
        self.uploaded_bytes += range.len();
        self.next_index += 1;
        Ok(())
    }

    /// Percentage of bytes confirmed, `floor(uploaded * 100 / total)`.
    ///
    /// An empty source counts as fully uploaded.
    pub fn progress(&self) -> u8 {
        percent_complete(self.uploaded_bytes, self.plan.total_len())
    }

    pub fn id(&self) -> PostId {
        self.id
    }

    pub fn plan(&self) -> &ChunkPlan {
        &self.plan
    }

    pub fn total_size(&self) -> u64 {
        self.plan.total_len()
    }

    pub fn chunk_size(&self) -> u64 {
        self.plan.chunk_size()
    }

    pub fn uploaded_bytes(&self) -> u64 {
        self.uploaded_bytes
    }

    /// Number of chunks confirmed so far.
    pub fn chunks_confirmed(&self) -> u64 {
        self.next_index
    }

    /// Returns `true` once every chunk in the plan has been confirmed.
    pub fn is_complete(&self) -> bool {
        self.next_index == self.plan.len()
    }
}

/// Integer percentage, saturating at 100. `total == 0` yields 100.
pub fn percent_complete(uploaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (uploaded as u128 * 100) / total as u128;
    pct.min(100) as u8
}
