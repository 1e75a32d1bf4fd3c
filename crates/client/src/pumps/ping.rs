//! Keepalive ping pump.

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use mediashare_protocol::constants::WS_PING_PERIOD;

/// Sends a numbered ping every [`WS_PING_PERIOD`] until cancelled or the
/// writer is gone.
///
/// The sequence number rides in the ping payload as 8 big-endian bytes, so
/// the matching pong can be told apart in traces. When the write queue is
/// full (a burst of chunk frames) the tick is skipped: the service is
/// already receiving traffic and will answer it.
pub(crate) async fn ping_pump(
    write_tx: mpsc::Sender<tungstenite::Message>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(WS_PING_PERIOD);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await;

    let mut seq: u64 = 0;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let ping = tungstenite::Message::Ping(seq.to_be_bytes().to_vec().into());
                match write_tx.try_send(ping) {
                    Ok(()) => seq += 1,
                    Err(TrySendError::Full(_)) => trace!(seq, "write queue busy, skipping ping"),
                    Err(TrySendError::Closed(_)) => break,
                }
            }
        }
    }
}

/// Sequence number carried by a pong, if it answers one of our pings.
pub(crate) fn pong_sequence(data: &[u8]) -> Option<u64> {
    let bytes: [u8; 8] = data.try_into().ok()?;
    Some(u64::from_be_bytes(bytes))
}
