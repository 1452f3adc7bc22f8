//! Discovery listener behavior against real UDP datagrams.

use std::net::Ipv4Addr;
use std::time::Duration;

use tokio::net::UdpSocket;

use lanlink_core::PeerRegistry;
use lanlinkd::discovery::listener::run_listener;

use crate::{shutdown_channel, wait_for};

const LOCAL: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);

/// Spawn a listener on an ephemeral loopback port. Returns the registry
/// and a sender already connected to the listener.
async fn listener_fixture() -> (PeerRegistry, UdpSocket, tokio::sync::broadcast::Sender<()>) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind listener");
    let listener_addr = socket.local_addr().expect("listener local_addr");

    let registry = PeerRegistry::new();
    let shutdown = shutdown_channel();
    tokio::spawn(run_listener(
        socket,
        registry.clone(),
        LOCAL,
        shutdown.subscribe(),
    ));

    let sender = UdpSocket::bind("127.0.0.1:0").await.expect("bind sender");
    sender.connect(listener_addr).await.expect("connect sender");

    (registry, sender, shutdown)
}

#[tokio::test]
async fn announcement_populates_the_registry() {
    let (registry, sender, _shutdown) = listener_fixture().await;

    sender.send(b"peer:10.0.0.2").await.expect("send");
    wait_for("peer 10.0.0.2 in registry", || {
        registry.contains(Ipv4Addr::new(10, 0, 0, 2))
    })
    .await;
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn own_announcement_is_filtered() {
    let (registry, sender, _shutdown) = listener_fixture().await;

    sender.send(b"peer:10.0.0.1").await.expect("send own");
    // A later valid announcement proves the first one was processed.
    sender.send(b"peer:10.0.0.3").await.expect("send other");

    wait_for("peer 10.0.0.3 in registry", || {
        registry.contains(Ipv4Addr::new(10, 0, 0, 3))
    })
    .await;
    assert!(!registry.contains(LOCAL));
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn malformed_datagrams_never_mutate_the_registry() {
    let (registry, sender, _shutdown) = listener_fixture().await;

    for payload in [
        &b"10.0.0.2"[..],
        b"node:10.0.0.2",
        b"peer:",
        b"peer:not-an-ip",
        b"",
        &[0xff, 0xfe, 0xfd],
    ] {
        sender.send(payload).await.expect("send malformed");
    }
    sender.send(b"peer:10.0.0.4").await.expect("send valid");

    wait_for("peer 10.0.0.4 in registry", || {
        registry.contains(Ipv4Addr::new(10, 0, 0, 4))
    })
    .await;
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn reannouncement_is_idempotent() {
    let (registry, sender, _shutdown) = listener_fixture().await;

    for _ in 0..3 {
        sender.send(b"peer:10.0.0.2").await.expect("send");
    }
    wait_for("peer 10.0.0.2 in registry", || {
        registry.contains(Ipv4Addr::new(10, 0, 0, 2))
    })
    .await;

    // Let any trailing datagrams drain, then confirm membership is stable.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.snapshot(), vec![Ipv4Addr::new(10, 0, 0, 2)]);
}
