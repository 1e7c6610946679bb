use super::{ChannelEndpoint, ClientState, ConnectionManager, RealtimeClient};
use crate::auth::{EnvToken, TokenProvider};
use crate::infrastructure::ReconnectPolicy;
use crate::messaging::HandlerRegistry;
use crate::types::{ChannelError, DEFAULT_CONNECT_TIMEOUT, EventFrame, HEARTBEAT_INTERVAL, Result};
use crate::websocket::{Connector, TungsteniteConnector};
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

/// First frame sent after the socket opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Handshake {
    /// `{"event":"join"}`
    #[default]
    Join,
    /// `{"event":"test_connection"}`; the server answers with `test_connection_response`
    TestConnection,
    /// Send nothing
    None,
}

impl Handshake {
    pub fn frame(&self) -> Option<EventFrame> {
        match self {
            Self::Join => Some(EventFrame::join()),
            Self::TestConnection => Some(EventFrame::test_connection()),
            Self::None => None,
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "join" => Some(Self::Join),
            "test_connection" => Some(Self::TestConnection),
            "none" | "" => Some(Self::None),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RealtimeClientOptions {
    pub heartbeat_interval: Duration,
    pub connect_timeout: Duration,
    pub reconnect: ReconnectPolicy,
    pub handshake: Handshake,
}

impl Default for RealtimeClientOptions {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_millis(HEARTBEAT_INTERVAL),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT),
            reconnect: ReconnectPolicy::default(),
            handshake: Handshake::default(),
        }
    }
}

impl RealtimeClientOptions {
    /// Defaults overridden by `TREESINDIA_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each
    /// `TREESINDIA_*` key. Unparseable values are logged and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();
        let millis = |key: &str| -> Option<Duration> {
            let raw = lookup(key)?;
            match raw.trim().parse::<u64>() {
                Ok(ms) => Some(Duration::from_millis(ms)),
                Err(e) => {
                    tracing::warn!("Ignoring {}={:?}: {}", key, raw, e);
                    None
                }
            }
        };

        if let Some(d) = millis("TREESINDIA_HEARTBEAT_INTERVAL_MS") {
            options.heartbeat_interval = d;
        }
        if let Some(d) = millis("TREESINDIA_CONNECT_TIMEOUT_MS") {
            options.connect_timeout = d;
        }
        if let Some(d) = millis("TREESINDIA_RECONNECT_BASE_MS") {
            options.reconnect.base_delay = d;
        }
        if let Some(d) = millis("TREESINDIA_RECONNECT_MAX_MS") {
            options.reconnect.max_delay = d;
        }
        if let Some(raw) = lookup("TREESINDIA_MAX_RECONNECT_ATTEMPTS") {
            match raw.trim().parse::<u32>() {
                Ok(n) => options.reconnect.max_attempts = n,
                Err(e) => tracing::warn!("Ignoring TREESINDIA_MAX_RECONNECT_ATTEMPTS={:?}: {}", raw, e),
            }
        }
        if let Some(raw) = lookup("TREESINDIA_HANDSHAKE") {
            match Handshake::parse(&raw) {
                Some(handshake) => options.handshake = handshake,
                None => tracing::warn!("Ignoring TREESINDIA_HANDSHAKE={:?}", raw),
            }
        }
        options
    }

    fn validate(&self) -> Result<()> {
        if self.heartbeat_interval.is_zero() {
            return Err(ChannelError::Config("heartbeat interval must be non-zero".to_string()));
        }
        if self.connect_timeout.is_zero() {
            return Err(ChannelError::Config("connect timeout must be non-zero".to_string()));
        }
        if self.reconnect.base_delay > self.reconnect.max_delay {
            return Err(ChannelError::Config(
                "reconnect base delay exceeds the maximum delay".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for RealtimeClient that handles initialization
pub struct RealtimeClientBuilder {
    endpoint: ChannelEndpoint,
    options: RealtimeClientOptions,
    tokens: Option<Arc<dyn TokenProvider>>,
    connector: Option<Arc<dyn Connector>>,
}

impl RealtimeClientBuilder {
    /// Create a new builder
    pub fn new(endpoint: ChannelEndpoint) -> Self {
        Self {
            endpoint,
            options: RealtimeClientOptions::default(),
            tokens: None,
            connector: None,
        }
    }

    pub fn options(mut self, options: RealtimeClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Token source; defaults to [`EnvToken`]
    pub fn token_provider(self, tokens: impl TokenProvider) -> Self {
        self.shared_token_provider(Arc::new(tokens))
    }

    pub fn shared_token_provider(mut self, tokens: Arc<dyn TokenProvider>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Transport; defaults to [`TungsteniteConnector`]
    pub fn connector(self, connector: impl Connector) -> Self {
        self.shared_connector(Arc::new(connector))
    }

    pub fn shared_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Build the client. Nothing is spawned until `connect()`.
    pub fn build(self) -> Result<RealtimeClient> {
        self.options.validate()?;

        let tokens: Arc<dyn TokenProvider> = match self.tokens {
            Some(tokens) => tokens,
            None => Arc::new(EnvToken::default()),
        };
        let connector: Arc<dyn Connector> = match self.connector {
            Some(connector) => connector,
            None => Arc::new(TungsteniteConnector),
        };

        Ok(RealtimeClient {
            endpoint: Arc::new(self.endpoint),
            state: Arc::new(RwLock::new(ClientState::new(self.options.reconnect))),
            options: self.options,
            connector,
            tokens,
            connection: Arc::new(ConnectionManager::new()),
            handlers: Arc::new(HandlerRegistry::new()),
            generation: Arc::new(AtomicU64::new(0)),
            connect_lock: Arc::new(Mutex::new(())),
        })
    }
}
