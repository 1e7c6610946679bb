use super::{HandlerRegistry, ServerEvent};
use crate::types::EventFrame;
use std::sync::Arc;

/// Longest slice of a raw frame that ends up in a log line
const LOG_PREVIEW_CHARS: usize = 256;

/// Start of `text`, cut at a char boundary, for logging.
pub(crate) fn preview(text: &str) -> &str {
    match text.char_indices().nth(LOG_PREVIEW_CHARS) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Parses inbound text frames and routes them to the handler registry.
///
/// Nothing here fails the connection: bad JSON, unknown tags and malformed
/// payloads are logged and dropped.
pub struct EventRouter {
    handlers: Arc<HandlerRegistry>,
}

impl EventRouter {
    pub fn new(handlers: Arc<HandlerRegistry>) -> Self {
        Self { handlers }
    }

    /// Routes one raw text frame. Returns whether a handler ran.
    pub fn route_text(&self, text: &str) -> bool {
        let frame = match serde_json::from_str::<EventFrame>(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(
                    "Failed to parse frame: {} - Raw ({} bytes): {}",
                    e,
                    text.len(),
                    preview(text)
                );
                return false;
            }
        };
        self.route(frame)
    }

    /// Routes a parsed frame
    pub fn route(&self, frame: EventFrame) -> bool {
        let tag = frame.event.clone();
        match ServerEvent::from_frame(frame) {
            Ok(Some(event)) => {
                tracing::debug!("Routing event {}", tag);
                let handled = self.handlers.dispatch(event);
                if !handled {
                    tracing::debug!("No handler registered for {}", tag);
                }
                handled
            }
            Ok(None) => {
                tracing::debug!("Ignoring unknown event {}", tag);
                false
            }
            Err(e) => {
                tracing::warn!("Dropping {} with malformed payload: {}", tag, e);
                false
            }
        }
    }
}
