use crate::types::constants::client_events;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One JSON text frame on the wire, in either direction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventFrame {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl EventFrame {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: None,
            timestamp: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn join() -> Self {
        Self::new(client_events::JOIN)
    }

    pub fn ping(timestamp: i64) -> Self {
        Self::new(client_events::PING).with_timestamp(timestamp)
    }

    pub fn get_conversations() -> Self {
        Self::new(client_events::GET_CONVERSATIONS)
    }

    pub fn mark_all_read() -> Self {
        Self::new(client_events::MARK_ALL_READ)
    }

    pub fn test_connection() -> Self {
        Self::new(client_events::TEST_CONNECTION)
    }
}

/// Milliseconds since the Unix epoch, as sent in `timestamp` fields.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
