use super::event::{ConversationMessage, ConversationStatus, ConversationUnreadCount, Notification};
use super::ServerEvent;
use crate::types::ConnectionFailure;
use serde_json::Value;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, PoisonError, RwLock};

type Handler<T> = Arc<dyn Fn(T) + Send + Sync + 'static>;

/// A replaceable reference to the current callback for one event.
///
/// The slot is read when an event arrives, not when the socket is set up, so
/// a callback registered later always wins over one captured earlier.
pub struct HandlerSlot<T> {
    current: RwLock<Option<Handler<T>>>,
}

impl<T> HandlerSlot<T> {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
        }
    }

    /// Install `handler`, replacing any previous one
    pub fn set<F>(&self, handler: F)
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(handler));
    }

    pub fn clear(&self) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn is_set(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Call the current handler with `value`. Returns whether one was set.
    ///
    /// A panicking handler is logged and contained; the caller keeps running.
    pub fn invoke(&self, value: T) -> bool {
        let handler = {
            let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
            current.clone()
        }; // Lock released here so the handler may re-register itself

        match handler {
            Some(handler) => {
                if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler(value))) {
                    let reason = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    tracing::error!("Event handler panicked: {}", reason);
                }
                true
            }
            None => false,
        }
    }
}

impl<T> Default for HandlerSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// One slot per server event plus the channel lifecycle callbacks.
#[derive(Default)]
pub struct HandlerRegistry {
    pub new_notification: HandlerSlot<Notification>,
    pub unread_count_update: HandlerSlot<u64>,
    pub notification_read: HandlerSlot<u64>,
    pub all_notifications_read: HandlerSlot<()>,
    pub pong: HandlerSlot<Option<i64>>,
    pub error: HandlerSlot<String>,
    pub conversation_message: HandlerSlot<ConversationMessage>,
    pub conversation_status: HandlerSlot<ConversationStatus>,
    pub total_unread_count: HandlerSlot<u64>,
    pub conversation_unread_count: HandlerSlot<ConversationUnreadCount>,
    pub conversations_data: HandlerSlot<Vec<Value>>,
    pub test_connection_response: HandlerSlot<Value>,
    /// Fired when the channel opens again after an unexpected drop
    pub reconnected: HandlerSlot<()>,
    /// Fired for terminal connection failures
    pub connection_error: HandlerSlot<ConnectionFailure>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes a typed event to its slot. Returns whether a handler ran.
    pub fn dispatch(&self, event: ServerEvent) -> bool {
        match event {
            ServerEvent::NewNotification(n) => self.new_notification.invoke(n),
            ServerEvent::UnreadCountUpdate(count) => self.unread_count_update.invoke(count),
            ServerEvent::NotificationRead(id) => self.notification_read.invoke(id),
            ServerEvent::AllNotificationsRead => self.all_notifications_read.invoke(()),
            ServerEvent::Pong { timestamp } => self.pong.invoke(timestamp),
            ServerEvent::Error(message) => self.error.invoke(message),
            ServerEvent::ConversationMessage(m) => self.conversation_message.invoke(m),
            ServerEvent::ConversationStatus(s) => self.conversation_status.invoke(s),
            ServerEvent::TotalUnreadCount(count) => self.total_unread_count.invoke(count),
            ServerEvent::ConversationUnreadCount(c) => self.conversation_unread_count.invoke(c),
            ServerEvent::ConversationsData(list) => self.conversations_data.invoke(list),
            ServerEvent::TestConnectionResponse(v) => self.test_connection_response.invoke(v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_latest_handler_wins() {
        let registry = HandlerRegistry::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&calls);
        registry
            .unread_count_update
            .set(move |n| first.lock().unwrap().push(("first", n)));
        let second = Arc::clone(&calls);
        registry
            .unread_count_update
            .set(move |n| second.lock().unwrap().push(("second", n)));

        assert!(registry.dispatch(ServerEvent::UnreadCountUpdate(3)));
        assert_eq!(*calls.lock().unwrap(), vec![("second", 3)]);
    }

    #[test]
    fn test_panicking_handler_is_contained() {
        let registry = HandlerRegistry::new();
        registry.unread_count_update.set(|_| panic!("consumer bug"));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        registry
            .total_unread_count
            .set(move |n| sink.lock().unwrap().push(n));

        assert!(registry.dispatch(ServerEvent::UnreadCountUpdate(1)));
        assert!(registry.dispatch(ServerEvent::TotalUnreadCount(2)));
        // the slot is still usable after the panic
        assert!(registry.dispatch(ServerEvent::UnreadCountUpdate(3)));
        assert_eq!(*seen.lock().unwrap(), vec![2]);
    }

    #[test]
    fn test_dispatch_without_handler() {
        let registry = HandlerRegistry::new();
        assert!(!registry.dispatch(ServerEvent::AllNotificationsRead));

        registry.all_notifications_read.set(|_| {});
        assert!(registry.all_notifications_read.is_set());
        registry.all_notifications_read.clear();
        assert!(!registry.dispatch(ServerEvent::AllNotificationsRead));
    }

    #[test]
    fn test_handler_may_replace_itself() {
        let registry = Arc::new(HandlerRegistry::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let inner_registry = Arc::clone(&registry);
        let inner_seen = Arc::clone(&seen);
        registry.error.set(move |message| {
            inner_seen.lock().unwrap().push(format!("old:{}", message));
            let replacement_seen = Arc::clone(&inner_seen);
            inner_registry
                .error
                .set(move |message| replacement_seen.lock().unwrap().push(format!("new:{}", message)));
        });

        registry.dispatch(ServerEvent::Error("a".to_string()));
        registry.dispatch(ServerEvent::Error("b".to_string()));
        assert_eq!(*seen.lock().unwrap(), vec!["old:a", "new:b"]);
    }
}
