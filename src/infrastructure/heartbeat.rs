use crate::client::ConnectionManager;
use crate::types::{ChannelError, EventFrame, HEARTBEAT_INTERVAL, Result, now_millis};
use std::future::Future;
use std::sync::Weak;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

/// Sends `ping` frames while the connection is open.
pub struct HeartbeatManager {
    interval: Duration,
    connection: Weak<ConnectionManager>,
}

impl HeartbeatManager {
    pub fn new(connection: Weak<ConnectionManager>) -> Self {
        Self {
            interval: Duration::from_millis(HEARTBEAT_INTERVAL),
            connection,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Spawns the heartbeat task. The first ping goes out one interval after
    /// the call; the owner aborts the task when the connection leaves `Open`.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval_timer = time::interval_at(Instant::now() + self.interval, self.interval);
            interval_timer.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

            loop {
                interval_timer.tick().await;

                let connection = match self.connection.upgrade() {
                    Some(conn) => conn,
                    None => {
                        // Client dropped, exit heartbeat task
                        break;
                    }
                };

                if !connection.is_connected() {
                    continue;
                }

                let timestamp = now_millis();
                match connection.send_frame(&EventFrame::ping(timestamp)).await {
                    Ok(()) => tracing::debug!("Sent heartbeat ping at {}", timestamp),
                    Err(e) => tracing::error!("[Heartbeat] Failed to send: {}", e),
                }
            }
        })
    }
}

/// Bounds the `Connecting` phase: the attempt fails with
/// [`ChannelError::Timeout`] if `connect` has not produced a socket in time.
pub async fn within_connect_timeout<T, F>(timeout: Duration, connect: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match time::timeout(timeout, connect).await {
        Ok(result) => result,
        Err(_) => Err(ChannelError::Timeout),
    }
}
