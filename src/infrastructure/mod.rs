// Infrastructure module - Core background services and utilities
pub mod heartbeat;
pub mod http;
pub mod task_manager;
pub mod timer;

pub use heartbeat::{HeartbeatManager, within_connect_timeout};
pub use http::{ApiEnvelope, Page, Pagination, RestClient};
pub use task_manager::TaskSlot;
pub use timer::{Backoff, ReconnectPolicy};
