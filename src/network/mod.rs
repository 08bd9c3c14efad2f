//! Socket supervision: the listener and the single client connection.

mod connection;
mod gateway;

pub use connection::Connection;
pub use gateway::Gateway;
