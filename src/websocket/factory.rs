use crate::types::Result;
use futures::future::BoxFuture;
use futures::{Sink, Stream, StreamExt};
use std::pin::Pin;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use url::Url;

/// Write half of an open socket
pub type SocketSink = Pin<Box<dyn Sink<Message, Error = WsError> + Send + Sync>>;

/// Read half of an open socket
pub type SocketStream = Pin<Box<dyn Stream<Item = std::result::Result<Message, WsError>> + Send>>;

/// An open WebSocket, split into its two halves.
pub struct Socket {
    pub sink: SocketSink,
    pub stream: SocketStream,
}

/// Opens sockets for the connection supervisor.
///
/// The supervisor never talks to the network directly, which lets tests swap
/// in an in-memory transport.
pub trait Connector: Send + Sync + 'static {
    fn connect(&self, url: Url) -> BoxFuture<'static, Result<Socket>>;
}

/// Default connector backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

impl Connector for TungsteniteConnector {
    fn connect(&self, url: Url) -> BoxFuture<'static, Result<Socket>> {
        Box::pin(async move {
            tracing::debug!(
                "Creating WebSocket connection to {}://{}{}",
                url.scheme(),
                url.host_str().unwrap_or_default(),
                url.path()
            );
            let (ws_stream, response) = connect_async(url.as_str()).await?;
            tracing::debug!("WebSocket handshake completed: {}", response.status());

            let (sink, stream) = ws_stream.split();
            Ok(Socket {
                sink: Box::pin(sink),
                stream: Box::pin(stream),
            })
        })
    }
}
