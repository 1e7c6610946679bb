use crate::auth::TokenProvider;
use crate::client::{ChannelEndpoint, ChannelTopic, ConnectionState, RealtimeClient};
use crate::messaging::{ConversationMessage, ConversationStatus, ConversationUnreadCount, Notification};
use crate::types::{ChannelError, ConnectionFailure, EventFrame, Result};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

/// What a screen or service holds to follow one realtime channel.
///
/// A `RealtimeChannel` wraps a [`RealtimeClient`] with the operations a
/// consumer needs: observe the connection, register a callback per server
/// event, send the few client frames the server understands, and switch the
/// whole thing on or off.
///
/// Callbacks are looked up when an event arrives, so registering a new one
/// replaces the old one immediately and never reopens the socket.
///
/// # Example
///
/// ```no_run
/// use treesindia_realtime::{RealtimeChannel, StaticToken};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let channel = RealtimeChannel::notifications(
///     "https://api.example.com",
///     StaticToken::new("access-token"),
/// )?;
///
/// channel.on_new_notification(|n| println!("new notification #{}", n.id));
/// channel.on_unread_count_update(|count| println!("{} unread", count));
/// channel.on_reconnected(|_| println!("back online, refetching"));
///
/// channel.set_enabled(true).await?;
/// // ...
/// channel.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct RealtimeChannel {
    client: RealtimeClient,
    enabled: AtomicBool,
}

impl RealtimeChannel {
    /// Facade over an already configured client. Starts disabled.
    pub fn new(client: RealtimeClient) -> Self {
        Self {
            client,
            enabled: AtomicBool::new(false),
        }
    }

    /// The user notification feed.
    pub fn notifications(base_url: &str, tokens: impl TokenProvider) -> Result<Self> {
        Self::for_topic(base_url, ChannelTopic::Notifications, tokens)
    }

    /// Conversation monitoring for admins.
    pub fn admin_conversations(base_url: &str, tokens: impl TokenProvider) -> Result<Self> {
        Self::for_topic(base_url, ChannelTopic::AdminConversations, tokens)
    }

    /// A single chat room.
    pub fn conversation(
        base_url: &str,
        conversation_id: u64,
        tokens: impl TokenProvider,
    ) -> Result<Self> {
        Self::for_topic(base_url, ChannelTopic::Conversation(conversation_id), tokens)
    }

    fn for_topic(base_url: &str, topic: ChannelTopic, tokens: impl TokenProvider) -> Result<Self> {
        let endpoint = ChannelEndpoint::new(base_url, topic)?;
        Ok(Self::new(RealtimeClient::new(endpoint, tokens)?))
    }

    pub fn client(&self) -> &RealtimeClient {
        &self.client
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Turns the channel on or off.
    ///
    /// Enabling connects (a no-op when already open). Disabling tears the
    /// socket down and cancels any pending reconnect; nothing reconnects until
    /// the channel is enabled again.
    pub async fn set_enabled(&self, enabled: bool) -> Result<()> {
        let was = self.enabled.swap(enabled, Ordering::SeqCst);
        if was != enabled {
            tracing::debug!(
                "Channel {} {}",
                self.client.endpoint(),
                if enabled { "enabled" } else { "disabled" }
            );
        }

        if enabled {
            self.client.connect().await
        } else {
            self.client.disconnect().await;
            Ok(())
        }
    }

    /// Same as `set_enabled(false)`. Call when the owning view goes away.
    pub async fn shutdown(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        self.client.disconnect().await;
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.client.state()
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_connected()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.client.watch_state()
    }

    /// Last connection failure; cleared by the next successful open
    pub async fn connection_error(&self) -> Option<ConnectionFailure> {
        self.client.last_error().await
    }

    /// Sends `frame` if the socket is open.
    ///
    /// Returns `false` and logs a warning otherwise. Frames are never queued
    /// for a later connection.
    pub async fn send_message(&self, frame: EventFrame) -> bool {
        match self.client.send(&frame).await {
            Ok(()) => true,
            Err(ChannelError::NotConnected) => {
                tracing::warn!("Channel not connected, dropping '{}' frame", frame.event);
                false
            }
            Err(e) => {
                tracing::warn!("Failed to send '{}' frame: {}", frame.event, e);
                false
            }
        }
    }

    pub async fn join(&self) -> bool {
        self.send_message(EventFrame::join()).await
    }

    pub async fn mark_all_read(&self) -> bool {
        self.send_message(EventFrame::mark_all_read()).await
    }

    pub async fn get_conversations(&self) -> bool {
        self.send_message(EventFrame::get_conversations()).await
    }

    pub async fn test_connection(&self) -> bool {
        self.send_message(EventFrame::test_connection()).await
    }

    // Event callbacks

    pub fn on_new_notification<F>(&self, handler: F)
    where
        F: Fn(Notification) + Send + Sync + 'static,
    {
        self.client.handlers().new_notification.set(handler);
    }

    pub fn on_unread_count_update<F>(&self, handler: F)
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.client.handlers().unread_count_update.set(handler);
    }

    /// Called with the id of the notification that was read
    pub fn on_notification_read<F>(&self, handler: F)
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.client.handlers().notification_read.set(handler);
    }

    pub fn on_all_notifications_read<F>(&self, handler: F)
    where
        F: Fn(()) + Send + Sync + 'static,
    {
        self.client.handlers().all_notifications_read.set(handler);
    }

    /// Called with the echoed timestamp, when the server includes one
    pub fn on_pong<F>(&self, handler: F)
    where
        F: Fn(Option<i64>) + Send + Sync + 'static,
    {
        self.client.handlers().pong.set(handler);
    }

    /// Application-level `error` events from the server. These do not
    /// affect the connection.
    pub fn on_error<F>(&self, handler: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.client.handlers().error.set(handler);
    }

    pub fn on_conversation_message<F>(&self, handler: F)
    where
        F: Fn(ConversationMessage) + Send + Sync + 'static,
    {
        self.client.handlers().conversation_message.set(handler);
    }

    pub fn on_conversation_status<F>(&self, handler: F)
    where
        F: Fn(ConversationStatus) + Send + Sync + 'static,
    {
        self.client.handlers().conversation_status.set(handler);
    }

    pub fn on_total_unread_count<F>(&self, handler: F)
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.client.handlers().total_unread_count.set(handler);
    }

    pub fn on_conversation_unread_count<F>(&self, handler: F)
    where
        F: Fn(ConversationUnreadCount) + Send + Sync + 'static,
    {
        self.client.handlers().conversation_unread_count.set(handler);
    }

    pub fn on_conversations_data<F>(&self, handler: F)
    where
        F: Fn(Vec<Value>) + Send + Sync + 'static,
    {
        self.client.handlers().conversations_data.set(handler);
    }

    pub fn on_test_connection_response<F>(&self, handler: F)
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        self.client.handlers().test_connection_response.set(handler);
    }

    /// Called each time the channel opens again after an unexpected drop.
    /// Use it to refetch whatever may have been missed while offline.
    pub fn on_reconnected<F>(&self, handler: F)
    where
        F: Fn(()) + Send + Sync + 'static,
    {
        self.client.handlers().reconnected.set(handler);
    }

    /// Called when the channel gives up: no token, or reconnects exhausted.
    pub fn on_connection_error<F>(&self, handler: F)
    where
        F: Fn(ConnectionFailure) + Send + Sync + 'static,
    {
        self.client.handlers().connection_error.set(handler);
    }
}
