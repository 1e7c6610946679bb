/// Client -> server event tags (magic strings layer)
pub mod client_events {
    pub const JOIN: &str = "join";
    pub const PING: &str = "ping";
    pub const GET_CONVERSATIONS: &str = "get_conversations";
    pub const MARK_ALL_READ: &str = "mark_all_read";
    pub const TEST_CONNECTION: &str = "test_connection";
}

/// Server -> client event tags (magic strings layer)
pub mod server_events {
    pub const NEW_NOTIFICATION: &str = "new_notification";
    pub const UNREAD_COUNT_UPDATE: &str = "unread_count_update";
    pub const NOTIFICATION_READ: &str = "notification_read";
    pub const ALL_NOTIFICATIONS_READ: &str = "all_notifications_read";
    pub const PONG: &str = "pong";
    pub const ERROR: &str = "error";
    pub const CONVERSATION_MESSAGE: &str = "conversation_message";
    pub const NEW_CONVERSATION_MESSAGE: &str = "new_conversation_message";
    pub const CONVERSATION_STATUS: &str = "conversation_status";
    pub const TOTAL_UNREAD_COUNT: &str = "total_unread_count";
    pub const CONVERSATION_UNREAD_COUNT: &str = "conversation_unread_count";
    pub const CONVERSATIONS_DATA: &str = "conversations_data";
    pub const TEST_CONNECTION_RESPONSE: &str = "test_connection_response";
}

/// REST/WebSocket API prefix shared by every endpoint
pub const API_PREFIX: &str = "api/v1";

/// Query parameter carrying the bearer token on the socket URL
pub const TOKEN_QUERY_PARAM: &str = "token";

/// Cookie that holds the access token in browser/mobile clients
pub const ACCESS_TOKEN_COOKIE: &str = "treesindia_access_token";

/// Environment variable read by `EnvToken`
pub const ACCESS_TOKEN_ENV: &str = "TREESINDIA_ACCESS_TOKEN";

/// Default connect timeout (milliseconds)
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 10_000;

/// Default heartbeat interval (milliseconds)
pub const HEARTBEAT_INTERVAL: u64 = 30_000;

/// Reconnect backoff base and ceiling (milliseconds)
pub const RECONNECT_BASE_DELAY: u64 = 1_000;
pub const RECONNECT_MAX_DELAY: u64 = 30_000;

/// Reconnects scheduled before the channel gives up
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// WebSocket close codes
pub const WS_CLOSE_NORMAL: u16 = 1000;
pub const WS_CLOSE_ABNORMAL: u16 = 1006;
