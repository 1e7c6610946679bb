use crate::types::{EventFrame, Result};
use crate::websocket::SocketSink;
use futures::SinkExt;
use tokio::sync::{RwLock, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

/// Lifecycle of the channel's socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Owns the write half of the current socket and publishes the connection state.
pub struct ConnectionManager {
    ws_write: RwLock<Option<SocketSink>>,
    state_tx: watch::Sender<ConnectionState>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Idle);
        Self {
            ws_write: RwLock::new(None),
            state_tx,
        }
    }

    /// Sets the WebSocket write sink (called after successful connection)
    pub async fn set_writer(&self, writer: SocketSink) {
        let mut ws = self.ws_write.write().await;
        *ws = Some(writer);
    }

    pub async fn has_writer(&self) -> bool {
        self.ws_write.read().await.is_some()
    }

    /// Gets the current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Sets the connection state and notifies watchers
    pub fn set_state(&self, new_state: ConnectionState) {
        let previous = self.state_tx.send_replace(new_state);
        if previous != new_state {
            tracing::debug!("Connection state {:?} -> {:?}", previous, new_state);
        }
    }

    /// Receiver that observes every state change
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Checks if currently connected
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Sends a frame through the WebSocket connection
    pub async fn send_frame(&self, frame: &EventFrame) -> Result<()> {
        let json = serde_json::to_string(frame)?;

        let mut ws_guard = self.ws_write.write().await;
        match ws_guard.as_mut() {
            Some(ws) => {
                ws.send(Message::text(json)).await?;
                Ok(())
            }
            None => Err(crate::types::ChannelError::NotConnected),
        }
    }

    /// Sends a close frame with `code` and drops the writer.
    pub async fn close(&self, code: u16) -> Result<()> {
        self.set_state(ConnectionState::Closing);

        let writer = self.ws_write.write().await.take();
        let result = match writer {
            Some(mut ws) => {
                let frame = CloseFrame {
                    code: CloseCode::from(code),
                    reason: "".into(),
                };
                let sent = ws.send(Message::Close(Some(frame))).await;
                // The peer may already be gone; the close frame is what matters.
                let _ = ws.close().await;
                sent.map_err(Into::into)
            }
            None => Ok(()),
        };

        self.set_state(ConnectionState::Closed);
        result
    }

    /// Clears the writer (used when the socket is already gone)
    pub async fn clear_writer(&self) {
        let mut ws = self.ws_write.write().await;
        *ws = None;
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}
