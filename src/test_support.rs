//! In-memory transport for exercising the supervisor without a network.

use crate::client::ConnectionState;
use crate::types::{ChannelError, EventFrame, Result};
use crate::websocket::{Connector, Socket};
use futures::channel::mpsc as fmpsc;
use futures::future::BoxFuture;
use futures::{FutureExt, SinkExt, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use url::Url;

/// Server side of an in-memory socket.
pub(crate) struct MockServer {
    pub url: Url,
    pub inbound: fmpsc::UnboundedSender<std::result::Result<Message, WsError>>,
    pub outbound: fmpsc::UnboundedReceiver<Message>,
}

impl MockServer {
    pub fn send_text(&self, text: &str) {
        let _ = self.inbound.unbounded_send(Ok(Message::text(text.to_string())));
    }

    pub fn close(&self, code: u16) {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: "".into(),
        };
        let _ = self.inbound.unbounded_send(Ok(Message::Close(Some(frame))));
    }

    /// Ends the stream without a close frame, like a dropped TCP connection.
    pub fn drop_connection(self) {}

    /// Next text frame the client sent
    pub async fn next_frame(&mut self) -> Option<EventFrame> {
        while let Some(message) = self.outbound.next().await {
            if let Message::Text(text) = message {
                return serde_json::from_str(text.as_str()).ok();
            }
        }
        None
    }

    /// Next text frame if one is already buffered
    pub fn try_next_frame(&mut self) -> Option<EventFrame> {
        loop {
            match self.outbound.next().now_or_never() {
                Some(Some(Message::Text(text))) => return serde_json::from_str(text.as_str()).ok(),
                Some(Some(_)) => continue,
                _ => return None,
            }
        }
    }

    /// Code of the next close frame the client sent
    pub async fn next_close_code(&mut self) -> Option<u16> {
        while let Some(message) = self.outbound.next().await {
            if let Message::Close(frame) = message {
                return frame.map(|f| u16::from(f.code));
            }
        }
        None
    }
}

pub(crate) fn socket_pair() -> (Socket, MockServer) {
    let (out_tx, out_rx) = fmpsc::unbounded::<Message>();
    let (in_tx, in_rx) = fmpsc::unbounded::<std::result::Result<Message, WsError>>();
    let sink = out_tx.sink_map_err(|_| WsError::ConnectionClosed);
    let socket = Socket {
        sink: Box::pin(sink),
        stream: Box::pin(in_rx),
    };
    let server = MockServer {
        url: Url::parse("ws://mock.invalid/").unwrap(),
        inbound: in_tx,
        outbound: out_rx,
    };
    (socket, server)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MockOutcome {
    Accept,
    Refuse,
    /// Never completes; trips the connect timeout
    Hang,
    /// Accepted after one second
    Slow,
}

/// Connector that hands out in-memory sockets. Outcomes are consumed in
/// order; once the queue is empty every attempt is accepted.
pub(crate) struct MockConnector {
    outcomes: Mutex<VecDeque<MockOutcome>>,
    call_times: Mutex<Vec<Instant>>,
    servers: mpsc::UnboundedSender<MockServer>,
}

impl MockConnector {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<MockServer>) {
        let (servers, rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            outcomes: Mutex::new(VecDeque::new()),
            call_times: Mutex::new(Vec::new()),
            servers,
        });
        (connector, rx)
    }

    pub fn push_outcomes(&self, outcomes: impl IntoIterator<Item = MockOutcome>) {
        self.outcomes.lock().unwrap().extend(outcomes);
    }

    pub fn calls(&self) -> usize {
        self.call_times.lock().unwrap().len()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.call_times.lock().unwrap().clone()
    }
}

impl Connector for MockConnector {
    fn connect(&self, url: Url) -> BoxFuture<'static, Result<Socket>> {
        self.call_times.lock().unwrap().push(Instant::now());
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(MockOutcome::Accept);

        match outcome {
            MockOutcome::Accept => {
                let (socket, mut server) = socket_pair();
                server.url = url;
                let _ = self.servers.send(server);
                async move { Ok(socket) }.boxed()
            }
            MockOutcome::Refuse => {
                async { Err(ChannelError::Connection("connection refused".to_string())) }.boxed()
            }
            MockOutcome::Hang => futures::future::pending().boxed(),
            MockOutcome::Slow => {
                let (socket, mut server) = socket_pair();
                server.url = url;
                let _ = self.servers.send(server);
                async move {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    Ok(socket)
                }
                .boxed()
            }
        }
    }
}

pub(crate) async fn wait_for_state(
    states: &mut watch::Receiver<ConnectionState>,
    target: ConnectionState,
) {
    tokio::time::timeout(Duration::from_secs(300), states.wait_for(|s| *s == target))
        .await
        .expect("timed out waiting for connection state")
        .expect("connection state sender dropped");
}
