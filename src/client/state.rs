use crate::infrastructure::{Backoff, ReconnectPolicy, TaskSlot};
use crate::types::ConnectionFailure;

/// Consolidated mutable state for RealtimeClient
/// Using a single struct reduces lock contention
pub struct ClientState {
    /// Reconnect attempt counter and delay curve
    pub backoff: Backoff,

    /// Last connection-level failure, cleared on a successful open
    pub last_error: Option<ConnectionFailure>,

    /// Whether the disconnect was manual (prevents auto-reconnect)
    pub was_manual_disconnect: bool,

    /// Whether the socket has opened since the last manual disconnect
    pub has_opened: bool,

    /// Reads frames off the current socket
    pub read_task: TaskSlot,

    /// Sends pings while open
    pub heartbeat_task: TaskSlot,

    /// Pending backoff timer
    pub reconnect_task: TaskSlot,
}

impl ClientState {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            backoff: Backoff::new(policy),
            last_error: None,
            was_manual_disconnect: false,
            has_opened: false,
            read_task: TaskSlot::new(),
            heartbeat_task: TaskSlot::new(),
            reconnect_task: TaskSlot::new(),
        }
    }

    pub fn record_failure(&mut self, failure: ConnectionFailure) {
        tracing::debug!("Recording connection failure: {}", failure);
        self.last_error = Some(failure);
    }
}

impl Default for ClientState {
    fn default() -> Self {
        Self::new(ReconnectPolicy::default())
    }
}
