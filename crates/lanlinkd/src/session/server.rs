//! Inbound session server.
//!
//! Accepts TCP connections on the application port. Each connection gets
//! its own task: read one message, log it, reply with the fixed
//! acknowledgment, close. There is no admission limit on concurrent
//! handlers.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

use lanlink_core::wire::{ACK_TEXT, MAX_MESSAGE_BYTES};

pub struct InboundServer {
    listener: TcpListener,
    shutdown: broadcast::Receiver<()>,
}

impl InboundServer {
    /// Bind the application port. Bind failure is reported to the caller,
    /// which logs it and gives up inbound service for the process lifetime.
    pub async fn bind(addr: SocketAddr, shutdown: broadcast::Receiver<()>) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind inbound server on {addr}"))?;
        Ok(Self { listener, shutdown })
    }

    /// The address actually bound — useful when the port was 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().context("inbound server local_addr")
    }

    pub async fn run(mut self) -> Result<()> {
        tracing::info!(addr = %self.local_addr()?, "inbound server starting");

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("inbound server shutting down");
                    return Ok(());
                }

                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            tokio::spawn(handle_connection(stream, peer));
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "accept failed");
                        }
                    }
                }
            }
        }
    }
}

/// One inbound session: bounded read, log, fixed reply. The connection is
/// closed on every exit path when the stream drops.
async fn handle_connection(mut stream: TcpStream, peer: SocketAddr) {
    let mut buf = vec![0u8; MAX_MESSAGE_BYTES];

    let n = match stream.read(&mut buf).await {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(peer = %peer, error = %e, "session read failed");
            return;
        }
    };

    let message = String::from_utf8_lossy(&buf[..n]);
    tracing::info!(peer = %peer, %message, "message received");

    if let Err(e) = stream.write_all(ACK_TEXT.as_bytes()).await {
        tracing::warn!(peer = %peer, error = %e, "session reply failed");
    }
}
