//! # TreesIndia Realtime
//!
//! Resilient WebSocket event channels for the TreesIndia notification and
//! chat backend.
//!
//! A channel keeps one socket open to a backend endpoint, answers the
//! server's expectations (a `join` handshake and periodic `ping` frames),
//! routes the JSON events it receives to typed callbacks, and reconnects with
//! capped exponential backoff when the connection drops.
//!
//! ## Example
//!
//! ```no_run
//! use treesindia_realtime::{EnvToken, RealtimeChannel};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let channel = RealtimeChannel::notifications("https://api.treesindia.com", EnvToken::default())?;
//!
//!     channel.on_new_notification(|n| println!("{:?}", n.title));
//!     channel.on_unread_count_update(|count| println!("unread: {}", count));
//!
//!     channel.set_enabled(true).await?;
//!     tokio::signal::ctrl_c().await?;
//!     channel.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod channel;
pub mod client;
pub mod infrastructure;
pub mod messaging;
pub mod types;
pub mod websocket;

#[cfg(test)]
pub(crate) mod test_support;

pub use auth::{CookieToken, EnvToken, StaticToken, TokenProvider};
pub use channel::RealtimeChannel;
pub use client::{
    ChannelEndpoint, ChannelTopic, ConnectionState, Handshake, RealtimeClient,
    RealtimeClientBuilder, RealtimeClientOptions,
};
pub use infrastructure::{Page, Pagination, ReconnectPolicy, RestClient};
pub use messaging::{
    ChatMessage, ConversationMessage, ConversationStatus, ConversationUnreadCount, Notification,
    ServerEvent,
};
pub use types::{ChannelError, ConnectionFailure, EventFrame, FailureKind, Result};
