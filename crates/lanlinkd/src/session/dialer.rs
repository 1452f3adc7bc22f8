//! Connection manager and retrying dialer.
//!
//! The manager sweeps the peer registry on a fixed interval and spawns one
//! independent dial task per known peer; no peer's outcome blocks the
//! sweep. A dial makes up to [`DialPolicy::max_attempts`] connect attempts
//! with a constant delay between them, retrying only on transient errors
//! (refused, timeout). A connect that succeeds is final: if the greeting
//! exchange then fails, the attempt is reported failed without retrying.

use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast;

use lanlink_core::wire::{self, MAX_MESSAGE_BYTES};
use lanlink_core::PeerRegistry;

/// Per-dial parameters, shared by every peer.
#[derive(Debug, Clone)]
pub struct DialPolicy {
    /// TCP port peers accept sessions on.
    pub app_port: u16,
    /// Total connect attempts before reporting exhaustion.
    pub max_attempts: u32,
    /// Constant delay between attempts.
    pub retry_delay: Duration,
}

impl Default for DialPolicy {
    fn default() -> Self {
        Self {
            app_port: wire::APP_PORT,
            max_attempts: wire::MAX_DIAL_ATTEMPTS,
            retry_delay: Duration::from_secs(wire::RETRY_DELAY_SECS),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DialError {
    /// Every attempt hit a retryable error. Distinct from [`DialError::Connect`]
    /// in logs only; callers treat both as a failed dial.
    #[error("connection attempts exhausted after {attempts} tries")]
    Exhausted { attempts: u32 },
    /// Non-retryable connect failure — the dial stops after one attempt.
    #[error("connect failed: {0}")]
    Connect(#[source] io::Error),
    /// The connection was established but the greeting exchange failed.
    #[error("greeting exchange failed: {0}")]
    Exchange(#[source] io::Error),
}

pub struct ConnectionManager {
    registry: PeerRegistry,
    local_addr: Ipv4Addr,
    policy: DialPolicy,
    sweep_interval: Duration,
    shutdown: broadcast::Receiver<()>,
}

impl ConnectionManager {
    pub fn new(
        registry: PeerRegistry,
        local_addr: Ipv4Addr,
        policy: DialPolicy,
        sweep_interval: Duration,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            registry,
            local_addr,
            policy,
            sweep_interval,
            shutdown,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        let mut interval = tokio::time::interval(self.sweep_interval);

        tracing::info!(
            sweep_secs = self.sweep_interval.as_secs_f64(),
            "connection manager starting"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("connection manager shutting down");
                    return Ok(());
                }

                _ = interval.tick() => {
                    self.sweep();
                }
            }
        }
    }

    /// Snapshot the registry and fan out one dial task per peer. The
    /// tasks are fire-and-forget: outcomes surface in logs only.
    fn sweep(&self) {
        let peers = self.registry.snapshot();
        tracing::debug!(peers = peers.len(), "manager sweep");

        for peer in peers {
            let local_addr = self.local_addr;
            let policy = self.policy.clone();
            tokio::spawn(async move {
                match dial_peer(peer, local_addr, &policy).await {
                    Ok(reply) => tracing::info!(%peer, %reply, "peer replied"),
                    Err(e) => tracing::warn!(%peer, error = %e, "dial failed"),
                }
            });
        }
    }
}

/// Dial one peer with bounded retry. On success returns the peer's reply.
pub async fn dial_peer(
    peer: Ipv4Addr,
    local_addr: Ipv4Addr,
    policy: &DialPolicy,
) -> Result<String, DialError> {
    for attempt in 1..=policy.max_attempts {
        match TcpStream::connect((IpAddr::V4(peer), policy.app_port)).await {
            Ok(stream) => {
                // Connected — no retry past this point regardless of how
                // the exchange goes.
                return exchange(stream, local_addr).await.map_err(DialError::Exchange);
            }
            Err(e) if is_retryable(&e) => {
                tracing::debug!(
                    %peer,
                    attempt,
                    max = policy.max_attempts,
                    error = %e,
                    "connect failed, will retry"
                );
                tokio::time::sleep(policy.retry_delay).await;
            }
            Err(e) => return Err(DialError::Connect(e)),
        }
    }

    Err(DialError::Exhausted {
        attempts: policy.max_attempts,
    })
}

/// One outbound session: write the greeting, read one bounded reply.
async fn exchange(mut stream: TcpStream, local_addr: Ipv4Addr) -> io::Result<String> {
    stream.write_all(wire::greeting(local_addr).as_bytes()).await?;

    let mut buf = vec![0u8; MAX_MESSAGE_BYTES];
    let n = stream.read(&mut buf).await?;
    Ok(String::from_utf8_lossy(&buf[..n]).into_owned())
}

/// Transient network conditions worth another attempt: connection refused,
/// timeouts, and the transport's would-block/temporary case. Everything
/// else (unreachable host, permission, resolution) fails the dial at once.
fn is_retryable(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused | io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}
