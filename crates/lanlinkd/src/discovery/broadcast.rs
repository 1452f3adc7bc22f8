//! Presence broadcast.
//!
//! Periodically sends `peer:<local-addr>` datagrams to the segment's
//! broadcast address so other nodes can discover this one. Send failures
//! are logged and dropped; the next tick is the retry.

use std::net::SocketAddrV4;
use std::time::Duration;

use anyhow::{Context, Result};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::sync::broadcast;
use tokio::time;

use lanlink_core::wire::Announcement;

/// Broadcast this node's presence on a regular interval.
///
/// Runs until the shutdown channel fires. If the socket cannot be created
/// the task exits early: the node stays silent but keeps listening and
/// dialing.
pub async fn broadcast_loop(
    announcement: Announcement,
    dest: SocketAddrV4,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let socket = make_broadcast_socket().context("failed to create broadcast socket")?;

    let payload = announcement.to_string();
    let mut ticker = time::interval(interval);

    tracing::info!(
        dest = %dest,
        interval_secs = interval.as_secs_f64(),
        "presence broadcast starting"
    );

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("presence broadcast shutting down");
                return Ok(());
            }

            _ = ticker.tick() => {
                match socket.send_to(payload.as_bytes(), &dest.into()) {
                    Ok(n) => tracing::trace!(bytes = n, "announcement sent"),
                    Err(e) => tracing::warn!(error = %e, "announcement send failed"),
                }
            }
        }
    }
}

/// Create a UDP socket allowed to send to the broadcast address.
fn make_broadcast_socket() -> Result<Socket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).context("socket()")?;
    socket.set_broadcast(true).context("SO_BROADCAST")?;
    Ok(socket)
}
