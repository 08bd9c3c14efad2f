//! Listener that accepts the bridge's one client.

use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

const BIND_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Bound listening socket.
pub struct Gateway {
    listener: TcpListener,
}

impl Gateway {
    /// Bind to the configured address, retrying forever on failure.
    ///
    /// Unbounded retry is intentional: the bridge is expected to outwait
    /// the network (or a lingering old socket) becoming ready.
    pub async fn bind(host: &str, port: u16) -> Self {
        info!(host, port, "Attempting to bind socket");
        loop {
            match TcpListener::bind((host, port)).await {
                Ok(listener) => {
                    info!(host, port, "Socket bound and listening");
                    return Self { listener };
                }
                Err(e) => {
                    warn!(host, port, error = %e, "Failed to bind socket, retrying");
                    tokio::time::sleep(BIND_RETRY_DELAY).await;
                }
            }
        }
    }

    /// Accept the single client connection of this process's lifetime.
    ///
    /// Consumes the gateway: there is no second accept.
    pub async fn accept_one(self) -> std::io::Result<(TcpStream, SocketAddr)> {
        info!("Now waiting for client connection");
        let (stream, addr) = self.listener.accept().await?;
        info!(%addr, "Connected to client");
        Ok((stream, addr))
    }
}
