mod factory;

pub use factory::{Connector, Socket, SocketSink, SocketStream, TungsteniteConnector};
