//! lanlinkd — LAN peer discovery daemon.

use std::net::{SocketAddr, SocketAddrV4};
use std::time::Duration;

use anyhow::{Context, Result};

use lanlink_core::config::LanlinkConfig;
use lanlink_core::netif::{self, AddressPolicy};
use lanlink_core::wire::Announcement;
use lanlink_core::PeerRegistry;

use lanlinkd::discovery::{broadcast, listener};
use lanlinkd::session::dialer::{ConnectionManager, DialPolicy};
use lanlinkd::session::server::InboundServer;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = LanlinkConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = LanlinkConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        LanlinkConfig::default()
    });

    // Local identity. Without an address the node cannot announce itself
    // or filter its own announcements, so failure here is fatal.
    let policy: AddressPolicy = config
        .network
        .address_policy
        .parse()
        .context("invalid network.address_policy")?;
    let local_addr =
        netif::resolve_local_ipv4(policy).context("failed to resolve local address")?;
    tracing::info!(addr = %local_addr, "local address resolved");

    let broadcast_dest = SocketAddrV4::new(
        config
            .network
            .broadcast_addr
            .parse()
            .context("invalid network.broadcast_addr")?,
        config.network.discovery_port,
    );
    let server_addr = SocketAddr::new(
        config
            .network
            .bind_addr
            .parse()
            .context("invalid network.bind_addr")?,
        config.network.app_port,
    );

    // Shared state
    let registry = PeerRegistry::new();

    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    // ── Spawn tasks ──────────────────────────────────────────────────────────
    //
    // Each task logs its own failure and dies alone: losing one capability
    // (say, the discovery listener's port) degrades the node for the
    // process lifetime but never takes the rest down.

    {
        let shutdown = shutdown_tx.subscribe();
        let announce_interval = Duration::from_secs(config.timing.announce_interval_secs);
        tokio::spawn(async move {
            let announcement = Announcement::new(local_addr);
            if let Err(e) =
                broadcast::broadcast_loop(announcement, broadcast_dest, announce_interval, shutdown)
                    .await
            {
                tracing::error!(error = %e, "presence broadcast failed");
            }
        });
    }

    {
        let registry = registry.clone();
        let shutdown = shutdown_tx.subscribe();
        let port = config.network.discovery_port;
        tokio::spawn(async move {
            if let Err(e) = listener::listener_loop(registry, local_addr, port, shutdown).await {
                tracing::error!(error = %e, "discovery listener failed");
            }
        });
    }

    {
        let shutdown = shutdown_tx.subscribe();
        tokio::spawn(async move {
            let result = match InboundServer::bind(server_addr, shutdown).await {
                Ok(server) => server.run().await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                tracing::error!(error = %e, "inbound server failed");
            }
        });
    }

    {
        let manager = ConnectionManager::new(
            registry,
            local_addr,
            DialPolicy {
                app_port: config.network.app_port,
                max_attempts: config.timing.max_dial_attempts,
                retry_delay: Duration::from_secs(config.timing.retry_delay_secs),
            },
            Duration::from_secs(config.timing.sweep_interval_secs),
            shutdown_tx.subscribe(),
        );
        tokio::spawn(async move {
            if let Err(e) = manager.run().await {
                tracing::error!(error = %e, "connection manager failed");
            }
        });
    }

    // ── Wait for exit ────────────────────────────────────────────────────────

    let mut shutdown_rx = shutdown_tx.subscribe();
    let _ = shutdown_rx.recv().await;
    tracing::info!("shutting down");

    Ok(())
}
