use thiserror::Error;

/// Errors that can occur when using the realtime channel.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// WebSocket protocol error (connection failed, invalid frame, etc.)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// General connection error with descriptive message
    #[error("Connection error: {0}")]
    Connection(String),

    /// No usable access token; never retried
    #[error("Authentication error: {0}")]
    Auth(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request error (REST fallback)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing error (malformed base URL)
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Base URL that cannot be turned into a socket URL
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Option values the client cannot run with
    #[error("Configuration error: {0}")]
    Config(String),

    /// REST envelope reported `success: false`
    #[error("API error: {0}")]
    Api(String),

    /// Socket did not open within the connect timeout
    #[error("Timeout error")]
    Timeout,

    /// Attempted operation while not connected to the server
    #[error("Not connected")]
    NotConnected,

    /// Reconnect ceiling reached without a successful open
    #[error("Failed to reconnect after {0} attempts")]
    ReconnectExhausted(u32),
}

/// Convenience type alias for `Result<T, ChannelError>`.
pub type Result<T> = std::result::Result<T, ChannelError>;

/// Category of the last connection-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No access token could be resolved. Terminal.
    MissingToken,
    /// Socket error or refused connection. Retried.
    Transport,
    /// Connect timeout expired. Retried.
    Timeout,
    /// Reconnect attempts used up. Terminal until re-enabled.
    Exhausted,
}

/// Observable record of the last connection-level error.
///
/// Unlike [`ChannelError`] this is `Clone`, so it can be stored as state and
/// handed to callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ConnectionFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Whether the supervisor stops retrying after this failure.
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, FailureKind::MissingToken | FailureKind::Exhausted)
    }
}

impl From<&ChannelError> for ConnectionFailure {
    fn from(error: &ChannelError) -> Self {
        let kind = match error {
            ChannelError::Auth(_) => FailureKind::MissingToken,
            ChannelError::Timeout => FailureKind::Timeout,
            ChannelError::ReconnectExhausted(_) => FailureKind::Exhausted,
            _ => FailureKind::Transport,
        };
        Self::new(kind, error.to_string())
    }
}

impl std::fmt::Display for ConnectionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}
