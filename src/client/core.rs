use super::{ChannelEndpoint, ClientState, ConnectionManager, ConnectionState};
use super::{RealtimeClientBuilder, RealtimeClientOptions};
use crate::auth::TokenProvider;
use crate::infrastructure::{HeartbeatManager, within_connect_timeout};
use crate::messaging::{EventRouter, HandlerRegistry, preview};
use crate::types::{
    ChannelError, ConnectionFailure, EventFrame, FailureKind, Result, WS_CLOSE_ABNORMAL,
    WS_CLOSE_NORMAL,
};
use crate::websocket::{Connector, Socket, SocketStream};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

/// Connection supervisor for one realtime channel.
///
/// `RealtimeClient` owns the socket for a single [`ChannelEndpoint`]: it opens
/// it with the current access token, sends the handshake frame, keeps it alive
/// with pings, routes inbound frames to the [`HandlerRegistry`], and
/// reconnects with exponential backoff after unexpected closures.
///
/// One client means one socket and one set of timers. A replacement socket is
/// only created after the previous one has been torn down, and frames from a
/// torn-down socket are never dispatched.
///
/// # Example
///
/// ```no_run
/// use treesindia_realtime::{ChannelEndpoint, ChannelTopic, RealtimeClient, StaticToken};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let endpoint = ChannelEndpoint::new("https://api.example.com", ChannelTopic::Notifications)?;
/// let client = RealtimeClient::builder(endpoint)
///     .token_provider(StaticToken::new("access-token"))
///     .build()?;
///
/// client.handlers().unread_count_update.set(|count| println!("unread: {}", count));
/// client.connect().await?;
/// // ...
/// client.disconnect().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RealtimeClient {
    pub(crate) endpoint: Arc<ChannelEndpoint>,
    pub(crate) options: RealtimeClientOptions,
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) tokens: Arc<dyn TokenProvider>,

    // Connection manager
    pub(crate) connection: Arc<ConnectionManager>,

    // Consolidated mutable state
    pub(crate) state: Arc<RwLock<ClientState>>,

    pub(crate) handlers: Arc<HandlerRegistry>,

    // Bumped whenever the current socket is replaced or torn down
    pub(crate) generation: Arc<AtomicU64>,

    // Serializes socket opens
    pub(crate) connect_lock: Arc<Mutex<()>>,
}

impl RealtimeClient {
    pub fn builder(endpoint: ChannelEndpoint) -> RealtimeClientBuilder {
        RealtimeClientBuilder::new(endpoint)
    }

    /// Client with default options and transport.
    pub fn new(endpoint: ChannelEndpoint, tokens: impl TokenProvider) -> Result<Self> {
        RealtimeClientBuilder::new(endpoint)
            .token_provider(tokens)
            .build()
    }

    /// Opens the socket unless it is already open.
    ///
    /// Cancels any pending reconnect first, so a manual connect never races a
    /// scheduled one, and starts a fresh reconnect budget. A missing access
    /// token fails immediately and is not retried; any other failure is
    /// recorded and handed to the reconnect path before the error is returned.
    pub async fn connect(&self) -> Result<()> {
        if self.connection.is_connected() {
            tracing::debug!("Already connected to {}", self.endpoint);
            return Ok(());
        }

        {
            let mut state = self.state.write().await;
            state.reconnect_task.abort();
            state.was_manual_disconnect = false;
            state.backoff.reset();
        }

        self.open_socket(None).await
    }

    /// Tears the channel down: pending reconnect, heartbeat, then socket.
    ///
    /// The socket is closed with code 1000, the state becomes `Closed`, and
    /// the attempt counter is reset. No reconnect happens afterwards until
    /// [`connect()`](Self::connect) is called again. Calling it twice is fine.
    pub async fn disconnect(&self) {
        {
            let mut state = self.state.write().await;
            state.was_manual_disconnect = true;
            state.reconnect_task.abort();
            state.heartbeat_task.abort();
            self.generation.fetch_add(1, Ordering::SeqCst);
            state.read_task.abort();
            state.backoff.reset();
            state.has_opened = false;
        }

        if self.connection.has_writer().await {
            tracing::info!("Disconnecting from {}", self.endpoint);
            if let Err(e) = self.connection.close(WS_CLOSE_NORMAL).await {
                tracing::debug!("Close handshake failed: {}", e);
            }
        }
        self.connection.set_state(ConnectionState::Closed);
    }

    /// Sends a frame on the open socket. Frames are never queued.
    pub async fn send(&self, frame: &EventFrame) -> Result<()> {
        if !self.is_connected() {
            return Err(ChannelError::NotConnected);
        }
        self.connection.send_frame(frame).await
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Receiver that observes every connection state change
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe()
    }

    /// Last connection-level failure, if any
    pub async fn last_error(&self) -> Option<ConnectionFailure> {
        self.state.read().await.last_error.clone()
    }

    /// Reconnects scheduled since the last successful open
    pub async fn reconnect_attempts(&self) -> u32 {
        self.state.read().await.backoff.attempts()
    }

    pub fn handlers(&self) -> &Arc<HandlerRegistry> {
        &self.handlers
    }

    pub fn endpoint(&self) -> &ChannelEndpoint {
        &self.endpoint
    }

    pub fn options(&self) -> &RealtimeClientOptions {
        &self.options
    }

    /// Opens a socket. `scheduled_by` is the generation a reconnect timer was
    /// armed for; the attempt is dropped if that socket has since been
    /// replaced or torn down.
    async fn open_socket(&self, scheduled_by: Option<u64>) -> Result<()> {
        let _guard = self.connect_lock.lock().await;
        if self.connection.is_connected() {
            return Ok(());
        }
        if self.attempt_cancelled(&*self.state.read().await, scheduled_by) {
            tracing::debug!("Reconnect cancelled before dialing");
            return Err(ChannelError::Connection(
                "connection attempt cancelled".to_string(),
            ));
        }

        let Some(token) = self.tokens.access_token().filter(|t| !t.is_empty()) else {
            let error = ChannelError::Auth("no access token available".to_string());
            tracing::error!("Cannot connect to {}: {}", self.endpoint, error);
            self.connection.set_state(ConnectionState::Closed);
            self.fail_terminally(ConnectionFailure::from(&error)).await;
            return Err(error);
        };
        let url = self.endpoint.socket_url(&token);

        let generation = {
            let state = self.state.write().await;
            if self.attempt_cancelled(&state, scheduled_by) {
                tracing::debug!("Channel was disconnected meanwhile, not opening a socket");
                return Err(ChannelError::Connection(
                    "connection attempt cancelled".to_string(),
                ));
            }
            // Published under the state lock so a concurrent disconnect
            // either sees this attempt or cancels it.
            self.connection.set_state(ConnectionState::Connecting);
            self.generation.fetch_add(1, Ordering::SeqCst) + 1
        };
        // The previous socket is gone before the next one exists.
        self.teardown_socket().await;
        tracing::info!("Connecting to {}", self.endpoint);

        let connect = self.connector.connect(url);
        let socket = match within_connect_timeout(self.options.connect_timeout, connect).await {
            Ok(socket) => socket,
            Err(e) => {
                tracing::warn!("Connection to {} failed: {}", self.endpoint, e);
                let failure = ConnectionFailure::from(&e);
                self.handle_close(generation, WS_CLOSE_ABNORMAL, Some(failure))
                    .await;
                return Err(e);
            }
        };

        self.on_open(generation, socket).await
    }

    /// Whether a disconnect, or a newer socket, has overtaken this attempt
    fn attempt_cancelled(&self, state: &ClientState, scheduled_by: Option<u64>) -> bool {
        let superseded = scheduled_by
            .is_some_and(|expected| self.generation.load(Ordering::SeqCst) != expected);
        state.was_manual_disconnect || superseded
    }

    async fn on_open(&self, generation: u64, socket: Socket) -> Result<()> {
        let Socket { mut sink, stream } = socket;

        let recovered = {
            let mut state = self.state.write().await;
            if state.was_manual_disconnect || self.generation.load(Ordering::SeqCst) != generation {
                drop(state);
                tracing::debug!("Connection attempt superseded, closing the new socket");
                let _ = sink.close().await;
                return Err(ChannelError::Connection(
                    "connection attempt superseded".to_string(),
                ));
            }
            self.connection.set_writer(sink).await;
            self.connection.set_state(ConnectionState::Open);
            state.backoff.reset();
            state.last_error = None;
            let recovered = state.has_opened;
            state.has_opened = true;
            state.read_task.replace(self.spawn_reader(generation, stream));
            recovered
        };
        tracing::info!("Connected to {}", self.endpoint);

        if let Some(frame) = self.options.handshake.frame() {
            if let Err(e) = self.connection.send_frame(&frame).await {
                tracing::warn!("Failed to send {} handshake: {}", frame.event, e);
            }
        }

        {
            let mut state = self.state.write().await;
            if self.generation.load(Ordering::SeqCst) == generation && self.connection.is_connected()
            {
                let heartbeat = HeartbeatManager::new(Arc::downgrade(&self.connection))
                    .with_interval(self.options.heartbeat_interval);
                state.heartbeat_task.replace(heartbeat.spawn());
            }
        }

        if recovered {
            tracing::info!("Channel recovered, notifying consumer to resync");
            self.handlers.reconnected.invoke(());
        }
        Ok(())
    }

    fn spawn_reader(&self, generation: u64, mut stream: SocketStream) -> JoinHandle<()> {
        let client = self.clone();
        tokio::spawn(async move {
            let router = EventRouter::new(Arc::clone(&client.handlers));
            let mut close_code = WS_CLOSE_ABNORMAL;
            let mut failure = None;

            tracing::debug!("Starting read task");
            while let Some(msg_result) = stream.next().await {
                if client.generation.load(Ordering::SeqCst) != generation {
                    tracing::debug!("Read task superseded, dropping stale socket");
                    return;
                }

                match msg_result {
                    Ok(Message::Text(text)) => {
                        tracing::debug!("Received text frame: {}", preview(text.as_str()));
                        router.route_text(text.as_str());
                    }
                    Ok(Message::Close(frame)) => {
                        if let Some(close_frame) = frame {
                            close_code = u16::from(close_frame.code);
                            tracing::info!(
                                "Server closed connection: code={}, reason='{}'",
                                close_code,
                                close_frame.reason.as_str()
                            );
                        } else {
                            tracing::warn!("Server closed connection without close frame");
                        }
                        break;
                    }
                    Ok(Message::Ping(data)) => {
                        tracing::debug!("Received ping ({} bytes)", data.len());
                    }
                    Ok(Message::Pong(data)) => {
                        tracing::debug!("Received pong ({} bytes)", data.len());
                    }
                    Ok(Message::Binary(data)) => {
                        tracing::warn!("Received unexpected binary message ({} bytes)", data.len());
                    }
                    Ok(Message::Frame(_)) => {
                        tracing::debug!("Received raw frame (internal)");
                    }
                    Err(e) => {
                        tracing::error!("WebSocket read error: {}", e);
                        failure = Some(ConnectionFailure::new(FailureKind::Transport, e.to_string()));
                        break;
                    }
                }
            }

            tracing::debug!("Read task finished");
            client.handle_close(generation, close_code, failure).await;
        })
    }

    /// Close handling for the socket of `generation`. Stale generations are
    /// ignored; abnormal closures schedule at most one reconnect.
    async fn handle_close(&self, generation: u64, code: u16, failure: Option<ConnectionFailure>) {
        let mut state = self.state.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!("Ignoring close of superseded socket");
            return;
        }

        state.heartbeat_task.abort();
        // Called from the read task itself; aborting would cancel this call.
        state.read_task.detach();
        self.connection.clear_writer().await;
        self.connection.set_state(ConnectionState::Closed);
        if let Some(failure) = failure {
            state.record_failure(failure);
        }

        if code == WS_CLOSE_NORMAL {
            tracing::info!("Connection to {} closed normally", self.endpoint);
            return;
        }
        if state.was_manual_disconnect {
            tracing::info!("Manual disconnect detected, will not attempt to reconnect");
            return;
        }

        if state.backoff.is_exhausted() {
            let attempts = state.backoff.max_attempts();
            drop(state);
            let error = ChannelError::ReconnectExhausted(attempts);
            tracing::error!("Giving up on {}: {}", self.endpoint, error);
            self.fail_terminally(ConnectionFailure::from(&error)).await;
            return;
        }

        if let Some(delay) = state.backoff.next_delay() {
            tracing::info!(
                "Connection lost (code {}), reconnect attempt {}/{} in {:?}",
                code,
                state.backoff.attempts(),
                state.backoff.max_attempts(),
                delay
            );
            self.schedule_reconnect(&mut state, generation, delay);
        }
    }

    fn schedule_reconnect(&self, state: &mut ClientState, generation: u64, delay: Duration) {
        let client = self.clone();
        state.reconnect_task.spawn(async move {
            tokio::time::sleep(delay).await;
            client.reconnect(generation).await;
        });
    }

    async fn reconnect(&self, scheduled_by: u64) {
        {
            let mut state = self.state.write().await;
            if state.was_manual_disconnect || self.generation.load(Ordering::SeqCst) != scheduled_by
            {
                tracing::debug!("Skipping reconnect scheduled by a superseded socket");
                return;
            }
            state.reconnect_task.detach();
        }

        tracing::info!("Attempting to reconnect...");
        match self.open_socket(Some(scheduled_by)).await {
            Ok(()) => tracing::info!("Reconnected successfully"),
            Err(e) => tracing::warn!("Reconnection attempt failed: {}", e),
        }
    }

    /// Stops the reader and heartbeat of the current socket and closes it.
    async fn teardown_socket(&self) {
        {
            let mut state = self.state.write().await;
            state.heartbeat_task.abort();
            state.read_task.abort();
        }
        if self.connection.has_writer().await {
            tracing::debug!("Closing stale socket before reconnecting");
            if let Err(e) = self.connection.close(WS_CLOSE_NORMAL).await {
                tracing::debug!("Closing stale socket failed: {}", e);
            }
        }
    }

    async fn fail_terminally(&self, failure: ConnectionFailure) {
        self.state.write().await.record_failure(failure.clone());
        self.handlers.connection_error.invoke(failure);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;
    use crate::client::ChannelTopic;
    use crate::infrastructure::ReconnectPolicy;
    use crate::test_support::{MockConnector, MockOutcome, wait_for_state};
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::AtomicUsize;

    fn endpoint() -> ChannelEndpoint {
        ChannelEndpoint::new("https://api.example.com", ChannelTopic::Notifications).unwrap()
    }

    fn client_with(connector: &Arc<MockConnector>) -> RealtimeClient {
        RealtimeClient::builder(endpoint())
            .token_provider(StaticToken::new("secret"))
            .shared_connector(connector.clone())
            .build()
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_sends_join_and_uses_token_url() {
        let (connector, mut servers) = MockConnector::new();
        let client = client_with(&connector);
        assert_eq!(client.state(), ConnectionState::Idle);

        client.connect().await.unwrap();
        assert_eq!(client.state(), ConnectionState::Open);

        let mut server = servers.recv().await.unwrap();
        assert_eq!(
            server.url.as_str(),
            "wss://api.example.com/api/v1/notifications/ws?token=secret"
        );
        assert_eq!(server.next_frame().await.unwrap().event, "join");
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_while_open_is_noop() {
        let (connector, mut servers) = MockConnector::new();
        let client = client_with(&connector);

        client.connect().await.unwrap();
        let mut server = servers.recv().await.unwrap();
        client.connect().await.unwrap();
        client.connect().await.unwrap();
        assert_eq!(connector.calls(), 1);

        // a single heartbeat per interval
        assert_eq!(server.next_frame().await.unwrap().event, "join");
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(server.next_frame().await.unwrap().event, "ping");
        assert!(server.try_next_frame().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_token_is_terminal() {
        let (connector, _servers) = MockConnector::new();
        let client = RealtimeClient::builder(endpoint())
            .token_provider(|| None::<String>)
            .shared_connector(connector.clone())
            .build()
            .unwrap();
        let errors = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        client
            .handlers()
            .connection_error
            .set(move |f| sink.lock().unwrap().push(f.kind));

        let result = client.connect().await;
        assert!(matches!(result, Err(ChannelError::Auth(_))));
        assert_eq!(client.state(), ConnectionState::Closed);
        assert_eq!(
            client.last_error().await.map(|f| f.kind),
            Some(FailureKind::MissingToken)
        );

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(connector.calls(), 0);
        assert_eq!(*errors.lock().unwrap(), vec![FailureKind::MissingToken]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_token_counts_as_missing() {
        let (connector, _servers) = MockConnector::new();
        let client = RealtimeClient::builder(endpoint())
            .token_provider(StaticToken::new(""))
            .shared_connector(connector.clone())
            .build()
            .unwrap();
        assert!(matches!(client.connect().await, Err(ChannelError::Auth(_))));
        assert_eq!(connector.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_normal_close_does_not_reconnect() {
        let (connector, mut servers) = MockConnector::new();
        let client = client_with(&connector);
        client.connect().await.unwrap();
        let server = servers.recv().await.unwrap();

        server.close(1000);
        let mut states = client.watch_state();
        wait_for_state(&mut states, ConnectionState::Closed).await;

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(connector.calls(), 1);
        assert_eq!(client.state(), ConnectionState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_ceiling_surfaces_terminal_error() {
        let (connector, mut servers) = MockConnector::new();
        let client = client_with(&connector);
        let exhausted = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&exhausted);
        client.handlers().connection_error.set(move |f| {
            assert_eq!(f.kind, FailureKind::Exhausted);
            counter.fetch_add(1, Ordering::SeqCst);
        });

        client.connect().await.unwrap();
        let server = servers.recv().await.unwrap();

        // every reconnect is refused
        connector.push_outcomes([MockOutcome::Refuse; 10]);
        let start = tokio::time::Instant::now();
        server.close(4000);

        tokio::time::sleep(Duration::from_secs(600)).await;
        // initial open + 5 reconnect attempts
        assert_eq!(connector.calls(), 6);
        assert_eq!(exhausted.load(Ordering::SeqCst), 1);
        assert_eq!(client.state(), ConnectionState::Closed);
        assert_eq!(client.reconnect_attempts().await, 5);
        assert_eq!(
            client.last_error().await.map(|f| f.kind),
            Some(FailureKind::Exhausted)
        );

        // 2 + 4 + 8 + 16 + 30 seconds of backoff went by before the last attempt
        let attempts = connector.call_times();
        let offsets: Vec<u64> = attempts[1..]
            .iter()
            .map(|t| t.duration_since(start).as_secs())
            .collect();
        assert_eq!(offsets, vec![2, 6, 14, 30, 60]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_counter_resets_after_successful_open() {
        let (connector, mut servers) = MockConnector::new();
        let client = client_with(&connector);
        client.connect().await.unwrap();
        let server = servers.recv().await.unwrap();

        // two failures, then success
        connector.push_outcomes([MockOutcome::Refuse, MockOutcome::Refuse]);
        server.close(4001);
        let second = servers.recv().await.unwrap();
        assert_eq!(connector.calls(), 4);
        let mut states = client.watch_state();
        wait_for_state(&mut states, ConnectionState::Open).await;
        assert_eq!(client.reconnect_attempts().await, 0);

        // the next drop waits for the first backoff step again
        let dropped_at = tokio::time::Instant::now();
        second.close(4001);
        let _third = servers.recv().await.unwrap();
        assert_eq!(dropped_at.elapsed().as_secs(), 2);
        wait_for_state(&mut states, ConnectionState::Open).await;
        assert_eq!(client.reconnect_attempts().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_cancels_pending_reconnect() {
        let (connector, mut servers) = MockConnector::new();
        let client = client_with(&connector);
        client.connect().await.unwrap();
        let server = servers.recv().await.unwrap();

        server.drop_connection();
        let mut states = client.watch_state();
        wait_for_state(&mut states, ConnectionState::Closed).await;
        assert!(client.state.read().await.reconnect_task.is_active());

        client.disconnect().await;
        client.disconnect().await;
        tokio::time::sleep(Duration::from_secs(120)).await;

        assert_eq!(connector.calls(), 1);
        assert_eq!(client.state(), ConnectionState::Closed);
        assert_eq!(client.reconnect_attempts().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_closes_with_normal_code_and_stops_heartbeat() {
        let (connector, mut servers) = MockConnector::new();
        let client = client_with(&connector);
        client.connect().await.unwrap();
        let mut server = servers.recv().await.unwrap();
        assert_eq!(server.next_frame().await.unwrap().event, "join");

        client.disconnect().await;
        assert_eq!(server.next_close_code().await, Some(1000));
        assert!(!client.state.read().await.heartbeat_task.is_active());
        assert!(matches!(
            client.send(&EventFrame::mark_all_read()).await,
            Err(ChannelError::NotConnected)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_timeout_routes_into_reconnect() {
        let (connector, mut servers) = MockConnector::new();
        let client = client_with(&connector);
        connector.push_outcomes([MockOutcome::Hang]);

        let result = client.connect().await;
        assert!(matches!(result, Err(ChannelError::Timeout)));
        assert_eq!(
            client.last_error().await.map(|f| f.kind),
            Some(FailureKind::Timeout)
        );
        assert_eq!(client.reconnect_attempts().await, 1);

        let _server = servers.recv().await.unwrap();
        let mut states = client.watch_state();
        wait_for_state(&mut states, ConnectionState::Open).await;
        assert_eq!(connector.calls(), 2);
        assert_eq!(client.last_error().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_connect_replaces_pending_reconnect() {
        let (connector, mut servers) = MockConnector::new();
        let client = client_with(&connector);
        client.connect().await.unwrap();
        let server = servers.recv().await.unwrap();

        server.close(4002);
        let mut states = client.watch_state();
        wait_for_state(&mut states, ConnectionState::Closed).await;

        client.connect().await.unwrap();
        let _second = servers.recv().await.unwrap();
        tokio::time::sleep(Duration::from_secs(120)).await;

        // the scheduled reconnect never produced a third socket
        assert_eq!(connector.calls(), 2);
        assert!(servers.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_handlers_receive_inbound_frames() {
        let (connector, mut servers) = MockConnector::new();
        let client = client_with(&connector);
        let counts = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&counts);
        client
            .handlers()
            .total_unread_count
            .set(move |n| sink.lock().unwrap().push(n));

        client.connect().await.unwrap();
        let server = servers.recv().await.unwrap();
        server.send_text(r#"{"event":"total_unread_count","data":{"total_unread_count":4}}"#);
        server.send_text("{broken");
        server.send_text(r#"{"event":"total_unread_count","data":{"total_unread_count":5}}"#);
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(*counts.lock().unwrap(), vec![4, 5]);
        assert!(client.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_policy_limits_attempts() {
        let (connector, mut servers) = MockConnector::new();
        let options = RealtimeClientOptions {
            reconnect: ReconnectPolicy {
                base_delay: Duration::from_millis(100),
                max_delay: Duration::from_millis(500),
                max_attempts: 1,
            },
            ..Default::default()
        };
        let client = RealtimeClient::builder(endpoint())
            .options(options)
            .token_provider(StaticToken::new("secret"))
            .shared_connector(connector.clone())
            .build()
            .unwrap();

        client.connect().await.unwrap();
        let server = servers.recv().await.unwrap();
        connector.push_outcomes([MockOutcome::Refuse; 3]);
        server.close(4003);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(connector.calls(), 2);
        assert_eq!(
            client.last_error().await.map(|f| f.kind),
            Some(FailureKind::Exhausted)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_after_exhaustion_gets_fresh_budget() {
        let (connector, mut servers) = MockConnector::new();
        let client = client_with(&connector);
        client.connect().await.unwrap();
        let server = servers.recv().await.unwrap();

        // five refused reconnects, then one refused manual dial
        connector.push_outcomes([MockOutcome::Refuse; 6]);
        server.close(4000);
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(connector.calls(), 6);
        assert_eq!(
            client.last_error().await.map(|f| f.kind),
            Some(FailureKind::Exhausted)
        );

        assert!(client.connect().await.is_err());
        assert_eq!(connector.calls(), 7);
        assert_eq!(client.reconnect_attempts().await, 1);
        assert_eq!(
            client.last_error().await.map(|f| f.kind),
            Some(FailureKind::Transport)
        );

        // the first backoff step dials again and succeeds
        let _server = servers.recv().await.unwrap();
        let mut states = client.watch_state();
        wait_for_state(&mut states, ConnectionState::Open).await;
        assert_eq!(connector.calls(), 8);
        assert_eq!(client.reconnect_attempts().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_after_reconnect_timer_fired() {
        let (connector, mut servers) = MockConnector::new();
        let client = client_with(&connector);
        client.connect().await.unwrap();
        let server = servers.recv().await.unwrap();

        // park the fired timer right before it dials
        let open_guard = client.connect_lock.lock().await;
        server.close(4000);
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!client.state.read().await.reconnect_task.is_active());

        client.disconnect().await;
        drop(open_guard);
        tokio::time::sleep(Duration::from_secs(120)).await;

        assert_eq!(connector.calls(), 1);
        assert_eq!(client.state(), ConnectionState::Closed);
        assert!(servers.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_during_reconnect_dial() {
        let (connector, mut servers) = MockConnector::new();
        let client = client_with(&connector);
        client.connect().await.unwrap();
        let server = servers.recv().await.unwrap();

        connector.push_outcomes([MockOutcome::Slow]);
        server.close(4000);
        // reconnect dials at 2s and completes at 3s
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(connector.calls(), 2);
        assert_eq!(client.state(), ConnectionState::Connecting);

        client.disconnect().await;
        let mut late = servers.recv().await.unwrap();
        tokio::time::sleep(Duration::from_secs(120)).await;

        assert_eq!(client.state(), ConnectionState::Closed);
        assert_eq!(connector.calls(), 2);
        // the late socket was closed without a handshake
        assert!(late.next_frame().await.is_none());
        assert!(!client.state.read().await.heartbeat_task.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_handler_keeps_reader_alive() {
        let (connector, mut servers) = MockConnector::new();
        let client = client_with(&connector);
        client
            .handlers()
            .unread_count_update
            .set(|_| panic!("consumer bug"));
        let counts = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&counts);
        client
            .handlers()
            .total_unread_count
            .set(move |n| sink.lock().unwrap().push(n));

        client.connect().await.unwrap();
        let server = servers.recv().await.unwrap();
        server.send_text(r#"{"event":"unread_count_update","data":{"unread_count":1}}"#);
        server.send_text(r#"{"event":"total_unread_count","data":{"total_unread_count":2}}"#);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(*counts.lock().unwrap(), vec![2]);

        // close handling still runs on the same reader
        server.close(4000);
        let _second = servers.recv().await.unwrap();
        assert_eq!(connector.calls(), 2);
    }
}
