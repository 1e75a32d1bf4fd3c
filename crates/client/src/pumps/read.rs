//! Read pump: routes replies to their waiting requests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use mediashare_protocol::constants::{WS_MAX_MESSAGE_SIZE, WS_PONG_WAIT};
use mediashare_protocol::envelope::Message;

use super::ping::pong_sequence;
use crate::ws_client::{DisconnectCallback, PendingMap};

/// Reads messages from the WebSocket and dispatches them.
///
/// Any incoming frame resets the liveness deadline; if nothing arrives
/// within [`WS_PONG_WAIT`] the connection is treated as dead. On exit every
/// pending request is failed by dropping its reply sender.
pub(crate) async fn read_pump<S>(
    mut read: S,
    pending: PendingMap,
    on_disconnect: DisconnectCallback,
    connected: Arc<AtomicBool>,
    write_tx: mpsc::Sender<tungstenite::Message>,
    cancel: CancellationToken,
) where
    S: Stream<Item = Result<tungstenite::Message, tungstenite::Error>> + Unpin,
{
    let deadline = tokio::time::sleep(WS_PONG_WAIT);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            () = &mut deadline => {
                warn!("no traffic from media service, closing connection");
                break;
            }

            msg = read.next() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        warn!("WebSocket read error: {e}");
                        break;
                    }
                    None => {
                        debug!("WebSocket stream ended");
                        break;
                    }
                };

                deadline.as_mut().reset(tokio::time::Instant::now() + WS_PONG_WAIT);

                match msg {
                    tungstenite::Message::Text(text) => {
                        handle_text_message(&text, &pending).await;
                    }
                    tungstenite::Message::Ping(data) => {
                        trace!("received ping, sending pong");
                        let _ = write_tx.send(tungstenite::Message::Pong(data)).await;
                    }
                    tungstenite::Message::Pong(data) => {
                        trace!(seq = ?pong_sequence(&data), "received pong");
                    }
                    tungstenite::Message::Close(frame) => {
                        debug!(?frame, "received close frame");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    connected.store(false, Ordering::Release);
    pending.lock().await.clear();

    if let Some(cb) = on_disconnect.lock().await.as_ref() {
        cb();
    }
}

async fn handle_text_message(text: &str, pending: &PendingMap) {
    if text.len() > WS_MAX_MESSAGE_SIZE {
        warn!("message too large ({} bytes), dropping", text.len());
        return;
    }

    let msg: Message = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            warn!("failed to parse message: {e}");
            return;
        }
    };

    trace!(msg_type = ?msg.msg_type, id = %msg.id, "received message");

    match pending.lock().await.remove(&msg.id) {
        Some(tx) => {
            let _ = tx.send(msg);
        }
        None => debug!(id = %msg.id, "reply for unknown or expired request, dropping"),
    }
}
