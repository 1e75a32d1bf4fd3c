//! WebSocket client for the media service.
//!
//! Implements request-response over a single connection with UUID
//! correlation and ping/pong keepalive. Chunk uploads travel as binary
//! frames; everything else is JSON text.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{Sink, Stream, StreamExt};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use mediashare_protocol::PostId;
use mediashare_protocol::constants::{
    MessageType, WS_BINARY_REQUEST_TIMEOUT, WS_MAX_MESSAGE_SIZE, WS_REQUEST_TIMEOUT,
};
use mediashare_protocol::envelope::Message;

/// Errors from the client crate.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("WebSocket error: {0}")]
    Ws(#[from] tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("request timed out")]
    Timeout,

    #[error("connection closed")]
    Closed,

    #[error("service error {code}: {message}")]
    Remote { code: i32, message: String },

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("post {0} not found")]
    NotFound(PostId),
}

/// In-flight requests keyed by message id.
pub(crate) type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<Message>>>>;

/// Callback type for disconnect notification.
pub(crate) type DisconnectCallback = Arc<Mutex<Option<Box<dyn Fn() + Send + Sync>>>>;

/// WebSocket client connected to the media service.
pub struct WsClient {
    write_tx: mpsc::Sender<tungstenite::Message>,
    pending: PendingMap,
    on_disconnect: DisconnectCallback,
    connected: Arc<AtomicBool>,
    _read_handle: tokio::task::JoinHandle<()>,
    _write_handle: tokio::task::JoinHandle<()>,
    _ping_handle: tokio::task::JoinHandle<()>,
    cancel: CancellationToken,
}

impl WsClient {
    /// Connects to the media service WebSocket endpoint.
    pub async fn connect(url: &str) -> Result<Self, ClientError> {
        let mut ws_config = tungstenite::protocol::WebSocketConfig::default();
        ws_config.max_message_size = Some(WS_MAX_MESSAGE_SIZE);
        ws_config.max_frame_size = Some(WS_MAX_MESSAGE_SIZE);
        let (ws_stream, _) =
            tokio_tungstenite::connect_async_with_config(url, Some(ws_config), false).await?;
        let (write, read) = ws_stream.split();

        debug!(url, "connected to media service");
        Ok(Self::spawn(read, write))
    }

    /// Starts the read, write and ping pumps over an already open stream.
    pub(crate) fn spawn<R, W>(read: R, write: W) -> Self
    where
        R: Stream<Item = Result<tungstenite::Message, tungstenite::Error>>
            + Unpin
            + Send
            + 'static,
        W: Sink<tungstenite::Message, Error = tungstenite::Error> + Unpin + Send + 'static,
    {
        let (write_tx, write_rx) = mpsc::channel::<tungstenite::Message>(256);
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let on_disconnect: DisconnectCallback = Arc::new(Mutex::new(None));
        let connected = Arc::new(AtomicBool::new(true));
        let cancel = CancellationToken::new();

        let write_handle = {
            let cancel = cancel.clone();
            tokio::spawn(crate::pumps::write::write_pump(write, write_rx, cancel))
        };

        let read_handle = {
            let pending = pending.clone();
            let on_disconnect = on_disconnect.clone();
            let connected = connected.clone();
            let write_tx = write_tx.clone();
            let cancel = cancel.clone();
            tokio::spawn(crate::pumps::read::read_pump(
                read,
                pending,
                on_disconnect,
                connected,
                write_tx,
                cancel,
            ))
        };

        let ping_handle = {
            let write_tx = write_tx.clone();
            let cancel = cancel.clone();
            tokio::spawn(crate::pumps::ping::ping_pump(write_tx, cancel))
        };

        Self {
            write_tx,
            pending,
            on_disconnect,
            connected,
            _read_handle: read_handle,
            _write_handle: write_handle,
            _ping_handle: ping_handle,
            cancel,
        }
    }

    /// Sends a request and waits for the response.
    pub async fn send_request<T: serde::Serialize>(
        &self,
        msg_type: MessageType,
        payload: Option<&T>,
    ) -> Result<Message, ClientError> {
        let id = uuid::Uuid::new_v4().to_string();
        let msg = Message::new(&id, msg_type, payload)?;
        let json = serde_json::to_string(&msg)?;

        self.round_trip(
            id,
            tungstenite::Message::Text(json.into()),
            WS_REQUEST_TIMEOUT,
        )
        .await
    }

    /// Sends binary data with a JSON header and waits for the text response.
    ///
    /// Wire format: `[4 bytes big-endian header length][JSON header][data]`.
    /// A UUID is injected into the header as `id` for correlation.
    pub async fn send_binary(
        &self,
        header: &serde_json::Value,
        data: &[u8],
    ) -> Result<Message, ClientError> {
        let id = uuid::Uuid::new_v4().to_string();

        let mut header = header.clone();
        if let Some(obj) = header.as_object_mut() {
            obj.insert("id".into(), serde_json::Value::String(id.clone()));
        }

        let frame = encode_binary_frame(&serde_json::to_vec(&header)?, data);

        // Chunk uploads get the longer timeout.
        self.round_trip(
            id,
            tungstenite::Message::Binary(frame.into()),
            WS_BINARY_REQUEST_TIMEOUT,
        )
        .await
    }

    async fn round_trip(
        &self,
        id: String,
        frame: tungstenite::Message,
        timeout: Duration,
    ) -> Result<Message, ClientError> {
        if !self.is_connected() {
            return Err(ClientError::Closed);
        }

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        // The read pump may have drained pending between the check above and
        // the insert; nothing would answer this request then.
        if !self.is_connected() {
            self.pending.lock().await.remove(&id);
            return Err(ClientError::Closed);
        }

        if self.write_tx.send(frame).await.is_err() {
            self.pending.lock().await.remove(&id);
            return Err(ClientError::Closed);
        }

        let result = tokio::time::timeout(timeout, rx).await;

        // Clean up pending entry on any exit path.
        self.pending.lock().await.remove(&id);

        match result {
            Ok(Ok(resp)) => resp.into_result().map_err(|err| {
                if err.is_unauthorized() {
                    warn!(message = %err.message, "media service refused the caller");
                }
                ClientError::Remote {
                    code: err.code,
                    message: err.message,
                }
            }),
            Ok(Err(_)) => Err(ClientError::Closed),
            Err(_) => Err(ClientError::Timeout),
        }
    }

    /// Sets the callback for disconnection.
    pub async fn set_disconnect_callback(&self, cb: Box<dyn Fn() + Send + Sync>) {
        *self.on_disconnect.lock().await = Some(cb);
    }

    /// Returns `false` once the read pump has stopped.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Gracefully closes the connection.
    pub async fn close(&self) {
        self.connected.store(false, Ordering::Release);
        self.cancel.cancel();
        let _ = self.write_tx.send(tungstenite::Message::Close(None)).await;
    }
}

impl Drop for WsClient {
    fn drop(&mut self) {
        self.cancel.cancel();
        self._read_handle.abort();
        self._write_handle.abort();
        self._ping_handle.abort();
    }
}

/// Builds `[4 BE bytes header len][header][data]`.
pub(crate) fn encode_binary_frame(header: &[u8], data: &[u8]) -> Vec<u8> {
    let header_len = header.len();
    let mut frame = Vec::with_capacity(4 + header_len + data.len());
    frame.push((header_len >> 24) as u8);
    frame.push((header_len >> 16) as u8);
    frame.push((header_len >> 8) as u8);
    frame.push(header_len as u8);
    frame.extend_from_slice(header);
    frame.extend_from_slice(data);
    frame
}
