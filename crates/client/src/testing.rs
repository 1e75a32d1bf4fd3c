//! In-process stand-in for the media service, used by unit tests.

use futures_util::{sink, stream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite;

use mediashare_protocol::constants::MessageType;
use mediashare_protocol::envelope::{Message, WsError};

use crate::ws_client::WsClient;

/// A request as the service sees it.
pub(crate) enum Request {
    Text(Message),
    Binary {
        header: serde_json::Value,
        data: Vec<u8>,
    },
}

impl Request {
    pub(crate) fn id(&self) -> String {
        match self {
            Request::Text(msg) => msg.id.clone(),
            Request::Binary { header, .. } => {
                header["id"].as_str().unwrap_or_default().to_string()
            }
        }
    }
}

pub(crate) struct FakeServer {
    from_client: mpsc::Receiver<tungstenite::Message>,
    to_client: Option<mpsc::Sender<Result<tungstenite::Message, tungstenite::Error>>>,
}

impl FakeServer {
    /// Returns a client wired to a fresh fake server.
    pub(crate) fn pair() -> (WsClient, FakeServer) {
        let (to_client, client_rx) = mpsc::channel(64);
        let (client_tx, from_client) = mpsc::channel(64);

        let read = Box::pin(stream::unfold(client_rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        }));
        let write = Box::pin(sink::unfold(
            client_tx,
            |tx, msg: tungstenite::Message| async move {
                let _ = tx.send(msg).await;
                Ok::<_, tungstenite::Error>(tx)
            },
        ));

        let server = FakeServer {
            from_client,
            to_client: Some(to_client),
        };
        (WsClient::spawn(read, write), server)
    }

    /// Next frame written by the client, skipping keepalive traffic.
    pub(crate) async fn recv(&mut self) -> Option<tungstenite::Message> {
        loop {
            match self.from_client.recv().await? {
                tungstenite::Message::Ping(_) | tungstenite::Message::Pong(_) => continue,
                msg => return Some(msg),
            }
        }
    }

    pub(crate) async fn recv_text(&mut self) -> Option<Message> {
        match self.recv().await? {
            tungstenite::Message::Text(text) => serde_json::from_str(&text).ok(),
            _ => None,
        }
    }

    pub(crate) async fn reply(&self, msg: &Message) {
        let json = serde_json::to_string(msg).unwrap();
        if let Some(tx) = &self.to_client {
            let _ = tx.send(Ok(tungstenite::Message::Text(json.into()))).await;
        }
    }

    /// Ends the client's read stream as if the server went away.
    pub(crate) fn hang_up(&mut self) {
        self.to_client = None;
    }

    /// Answers every request with `handler` until the client closes.
    pub(crate) fn serve<F>(mut self, handler: F) -> JoinHandle<()>
    where
        F: Fn(Request) -> Message + Send + 'static,
    {
        tokio::spawn(async move {
            while let Some(frame) = self.recv().await {
                let request = match frame {
                    tungstenite::Message::Text(text) => match serde_json::from_str(&text) {
                        Ok(msg) => Request::Text(msg),
                        Err(_) => continue,
                    },
                    tungstenite::Message::Binary(bytes) => match decode_binary_frame(&bytes) {
                        Some((header, data)) => Request::Binary {
                            header,
                            data: data.to_vec(),
                        },
                        None => continue,
                    },
                    _ => break,
                };
                let reply = handler(request);
                self.reply(&reply).await;
            }
        })
    }
}

/// Error reply the service sends instead of a payload.
pub(crate) fn error_reply(id: impl Into<String>, code: i32, message: &str) -> Message {
    let mut msg = Message::new::<()>(id, MessageType::Error, None).unwrap();
    msg.error = Some(WsError {
        code,
        message: message.into(),
    });
    msg
}

/// Splits `[4 BE bytes header len][header][data]`.
pub(crate) fn decode_binary_frame(frame: &[u8]) -> Option<(serde_json::Value, &[u8])> {
    let len_bytes: [u8; 4] = frame.get(..4)?.try_into().ok()?;
    let header_len = u32::from_be_bytes(len_bytes) as usize;
    let header = frame.get(4..4 + header_len)?;
    let header = serde_json::from_slice(header).ok()?;
    Some((header, &frame[4 + header_len..]))
}
