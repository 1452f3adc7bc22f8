//! lanlink integration test harness.
//!
//! Everything runs in-process over loopback: the discovery listener,
//! broadcaster, inbound server, and dialer are driven directly through the
//! lanlinkd library crate with shortened intervals and ephemeral ports.
//! The end-to-end test gives each node its own loopback address
//! (127.0.0.1 / 127.0.0.2) so the self-announcement filter behaves as it
//! would on a real segment.

mod discovery;
mod exchange;

use std::time::Duration;

use tokio::sync::broadcast;

/// Poll `cond` until it holds or a 5-second deadline expires.
pub async fn wait_for(what: &str, cond: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// A shutdown channel matching the daemon's wiring.
pub fn shutdown_channel() -> broadcast::Sender<()> {
    broadcast::channel(1).0
}

/// Reserve a loopback TCP port with nothing listening on it.
pub async fn refused_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind probe listener");
    let port = listener.local_addr().expect("probe local_addr").port();
    drop(listener);
    port
}
