// Module declarations
mod builder;
mod connection;
mod core;
mod endpoint;
mod state;

// Public API exports
pub use builder::{Handshake, RealtimeClientBuilder, RealtimeClientOptions};
pub use connection::{ConnectionManager, ConnectionState};
pub use core::RealtimeClient;
pub use endpoint::{ChannelEndpoint, ChannelTopic};
pub use state::ClientState;
