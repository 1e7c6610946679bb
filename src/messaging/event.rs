use crate::types::constants::server_events;
use crate::types::{EventFrame, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Payload of `new_notification`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "type")]
    pub notification_type: Option<String>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    /// Any other fields the server sends, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A chat message inside `conversation_message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: u64,
    #[serde(default)]
    pub sender_id: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload of `conversation_message` / `new_conversation_message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub conversation_id: u64,
    pub message: ChatMessage,
}

/// Payload of `conversation_status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationStatus {
    pub conversation_id: u64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Payload of `conversation_unread_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationUnreadCount {
    pub conversation_id: u64,
    pub unread_count: u64,
}

#[derive(Deserialize)]
struct UnreadCountPayload {
    unread_count: u64,
}

#[derive(Deserialize)]
struct TotalUnreadPayload {
    #[serde(alias = "unread_count")]
    total_unread_count: u64,
}

#[derive(Deserialize)]
struct NotificationReadPayload {
    #[serde(alias = "id")]
    notification_id: u64,
}

#[derive(Deserialize)]
struct ConversationsPayload {
    conversations: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorPayload {
    Text(String),
    Object {
        #[serde(alias = "error")]
        message: String,
    },
}

#[derive(Deserialize, Default)]
struct PongPayload {
    #[serde(default)]
    timestamp: Option<i64>,
}

/// Server -> client events, validated at the parse boundary.
///
/// Each variant carries only the narrowed payload its handler needs.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    NewNotification(Notification),
    UnreadCountUpdate(u64),
    NotificationRead(u64),
    AllNotificationsRead,
    Pong { timestamp: Option<i64> },
    Error(String),
    ConversationMessage(ConversationMessage),
    ConversationStatus(ConversationStatus),
    TotalUnreadCount(u64),
    ConversationUnreadCount(ConversationUnreadCount),
    ConversationsData(Vec<Value>),
    TestConnectionResponse(Value),
}

impl ServerEvent {
    /// Narrows a frame into a typed event.
    ///
    /// Returns `Ok(None)` for tags this client does not know, and an error
    /// when a known tag carries a payload of the wrong shape.
    pub fn from_frame(frame: EventFrame) -> Result<Option<Self>> {
        let EventFrame {
            event,
            data,
            timestamp,
        } = frame;

        let parsed = match event.as_str() {
            server_events::NEW_NOTIFICATION => Self::NewNotification(payload(data)?),
            server_events::UNREAD_COUNT_UPDATE => {
                Self::UnreadCountUpdate(payload::<UnreadCountPayload>(data)?.unread_count)
            }
            server_events::NOTIFICATION_READ => {
                Self::NotificationRead(payload::<NotificationReadPayload>(data)?.notification_id)
            }
            server_events::ALL_NOTIFICATIONS_READ => Self::AllNotificationsRead,
            server_events::PONG => {
                let body: PongPayload = match data {
                    Some(Value::Object(_)) => payload(data)?,
                    _ => PongPayload::default(),
                };
                Self::Pong {
                    timestamp: timestamp.or(body.timestamp),
                }
            }
            server_events::ERROR => match payload::<ErrorPayload>(data)? {
                ErrorPayload::Text(message) | ErrorPayload::Object { message } => {
                    Self::Error(message)
                }
            },
            server_events::CONVERSATION_MESSAGE | server_events::NEW_CONVERSATION_MESSAGE => {
                Self::ConversationMessage(payload(data)?)
            }
            server_events::CONVERSATION_STATUS => Self::ConversationStatus(payload(data)?),
            server_events::TOTAL_UNREAD_COUNT => {
                Self::TotalUnreadCount(payload::<TotalUnreadPayload>(data)?.total_unread_count)
            }
            server_events::CONVERSATION_UNREAD_COUNT => {
                Self::ConversationUnreadCount(payload(data)?)
            }
            server_events::CONVERSATIONS_DATA => {
                Self::ConversationsData(payload::<ConversationsPayload>(data)?.conversations)
            }
            server_events::TEST_CONNECTION_RESPONSE => {
                Self::TestConnectionResponse(data.unwrap_or(Value::Null))
            }
            _ => return Ok(None),
        };
        Ok(Some(parsed))
    }

    /// Wire tag of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewNotification(_) => server_events::NEW_NOTIFICATION,
            Self::UnreadCountUpdate(_) => server_events::UNREAD_COUNT_UPDATE,
            Self::NotificationRead(_) => server_events::NOTIFICATION_READ,
            Self::AllNotificationsRead => server_events::ALL_NOTIFICATIONS_READ,
            Self::Pong { .. } => server_events::PONG,
            Self::Error(_) => server_events::ERROR,
            Self::ConversationMessage(_) => server_events::CONVERSATION_MESSAGE,
            Self::ConversationStatus(_) => server_events::CONVERSATION_STATUS,
            Self::TotalUnreadCount(_) => server_events::TOTAL_UNREAD_COUNT,
            Self::ConversationUnreadCount(_) => server_events::CONVERSATION_UNREAD_COUNT,
            Self::ConversationsData(_) => server_events::CONVERSATIONS_DATA,
            Self::TestConnectionResponse(_) => server_events::TEST_CONNECTION_RESPONSE,
        }
    }
}

impl std::fmt::Display for ServerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn payload<T: DeserializeOwned>(data: Option<Value>) -> Result<T> {
    Ok(serde_json::from_value(data.unwrap_or(Value::Null))?)
}
