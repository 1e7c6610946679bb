// Messaging module - typed events, handler registry and frame routing
pub mod event;
pub mod handlers;
pub mod router;

pub use event::{
    ChatMessage, ConversationMessage, ConversationStatus, ConversationUnreadCount, Notification,
    ServerEvent,
};
pub use handlers::{HandlerRegistry, HandlerSlot};
pub use router::EventRouter;
pub(crate) use router::preview;
