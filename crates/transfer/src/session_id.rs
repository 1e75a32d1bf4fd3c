use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use mediashare_protocol::PostId;
use rand::Rng;

/// Produces identifiers for new upload sessions.
pub trait SessionIdSource: Send + Sync {
    fn next_id(&self) -> PostId;
}

/// Client-side ids: `unix_millis * 1000 + random(0..1000)`.
///
/// Ids issued by one instance are strictly increasing, so rapid repeated
/// calls within the same millisecond never collide locally. Ids generated
/// by separate processes can still collide.
#[derive(Debug, Default)]
pub struct TimeRandomIdSource {
    last: AtomicU64,
}

impl TimeRandomIdSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn candidate() -> PostId {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let jitter: u64 = rand::thread_rng().gen_range(0..1000);
        millis.saturating_mul(1000).saturating_add(jitter)
    }
}

impl SessionIdSource for TimeRandomIdSource {
    fn next_id(&self) -> PostId {
        let candidate = Self::candidate();
        let prev = self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(candidate.max(last.saturating_add(1)))
            })
            .unwrap_or_default();
        candidate.max(prev.saturating_add(1))
    }
}
