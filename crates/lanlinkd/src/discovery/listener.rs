//! Presence listener.
//!
//! Receives `peer:<addr>` datagrams on the discovery port and feeds the
//! peer registry. Our own announcements loop back over broadcast, so
//! anything carrying the local address is skipped — the registry never
//! contains this node.

use std::net::{Ipv4Addr, SocketAddrV4};

use anyhow::{Context, Result};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::broadcast;

use lanlink_core::wire::{Announcement, MAX_MESSAGE_BYTES};
use lanlink_core::PeerRegistry;

/// Listen for presence announcements and populate the peer registry.
///
/// Runs until the shutdown channel fires. Bind failure ends the task:
/// the node discovers nobody but can still announce and accept.
pub async fn listener_loop(
    registry: PeerRegistry,
    local_addr: Ipv4Addr,
    port: u16,
    shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let socket = make_listener_socket(port).context("failed to create discovery socket")?;
    let socket = UdpSocket::from_std(socket).context("failed to convert to tokio UdpSocket")?;

    tracing::info!(port, "discovery listener starting");
    run_listener(socket, registry, local_addr, shutdown).await
}

/// The receive loop, split from the socket setup so tests can bind an
/// ephemeral port and drive it directly.
pub async fn run_listener(
    socket: UdpSocket,
    registry: PeerRegistry,
    local_addr: Ipv4Addr,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let mut buf = vec![0u8; MAX_MESSAGE_BYTES];

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("discovery listener shutting down");
                return Ok(());
            }

            result = socket.recv_from(&mut buf) => {
                let (len, from) = match result {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!(error = %e, "recv_from failed");
                        continue;
                    }
                };

                let payload = match std::str::from_utf8(&buf[..len]) {
                    Ok(p) => p,
                    Err(_) => {
                        tracing::trace!(from = %from, "non-UTF-8 datagram ignored");
                        continue;
                    }
                };

                let Some(announcement) = Announcement::parse(payload) else {
                    tracing::trace!(from = %from, "malformed datagram ignored");
                    continue;
                };

                if announcement.addr == local_addr {
                    tracing::trace!("ignoring own announcement");
                    continue;
                }

                if registry.insert(announcement.addr) {
                    tracing::info!(peer = %announcement.addr, "peer discovered");
                } else {
                    tracing::trace!(peer = %announcement.addr, "peer re-announced");
                }
            }
        }
    }
}

/// Create a UDP socket bound on all interfaces for the discovery port.
fn make_listener_socket(port: u16) -> Result<std::net::UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).context("socket()")?;
    socket.set_reuse_address(true).context("SO_REUSEADDR")?;
    socket.set_nonblocking(true).context("set_nonblocking")?;

    let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port);
    socket.bind(&bind_addr.into()).context("bind()")?;

    Ok(socket.into())
}
