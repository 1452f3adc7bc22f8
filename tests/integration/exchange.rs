//! Greeting exchange over real TCP: inbound server and retrying dialer.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use lanlink_core::wire::ACK_TEXT;
use lanlinkd::session::dialer::{dial_peer, DialError, DialPolicy};
use lanlinkd::session::server::InboundServer;

use crate::{refused_port, shutdown_channel};

/// Spawn an inbound server on an ephemeral loopback port.
async fn server_fixture() -> (u16, tokio::sync::broadcast::Sender<()>) {
    let shutdown = shutdown_channel();
    let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let server = InboundServer::bind(addr, shutdown.subscribe())
        .await
        .expect("bind inbound server");
    let port = server.local_addr().expect("server local_addr").port();
    tokio::spawn(server.run());
    (port, shutdown)
}

fn test_policy(app_port: u16) -> DialPolicy {
    DialPolicy {
        app_port,
        max_attempts: 5,
        retry_delay: Duration::from_millis(10),
    }
}

#[tokio::test]
async fn server_replies_with_the_fixed_acknowledgment() {
    let (port, _shutdown) = server_fixture().await;

    let mut stream = TcpStream::connect(("127.0.0.1", port))
        .await
        .expect("connect");
    stream.write_all(b"ping").await.expect("write");
    stream.shutdown().await.expect("close write side");

    let mut reply = String::new();
    stream.read_to_string(&mut reply).await.expect("read reply");
    assert_eq!(reply, ACK_TEXT);
}

#[tokio::test]
async fn dial_completes_one_exchange() {
    let (port, _shutdown) = server_fixture().await;

    let reply = dial_peer(
        Ipv4Addr::LOCALHOST,
        Ipv4Addr::new(10, 9, 8, 7),
        &test_policy(port),
    )
    .await
    .expect("dial should succeed");
    assert_eq!(reply, ACK_TEXT);
}

#[tokio::test]
async fn dial_sends_exactly_one_greeting_with_the_local_address() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().unwrap().port();

    let accept = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        let mut buf = vec![0u8; 1024];
        let n = stream.read(&mut buf).await.expect("read greeting");
        stream.write_all(b"noted").await.expect("reply");
        String::from_utf8(buf[..n].to_vec()).expect("utf8 greeting")
    });

    let reply = dial_peer(
        Ipv4Addr::LOCALHOST,
        Ipv4Addr::new(10, 9, 8, 7),
        &test_policy(port),
    )
    .await
    .expect("dial should succeed");

    assert_eq!(reply, "noted");
    assert_eq!(accept.await.unwrap(), "Hello from 10.9.8.7");
}

#[tokio::test]
async fn nonretryable_dial_fails_after_one_attempt() {
    // Connecting to the broadcast address yields a connect error that is
    // neither refused nor timeout, so the dial must stop immediately.
    let policy = DialPolicy {
        app_port: 18888,
        max_attempts: 5,
        retry_delay: Duration::from_millis(100),
    };

    let started = Instant::now();
    let err = dial_peer(Ipv4Addr::BROADCAST, Ipv4Addr::LOCALHOST, &policy)
        .await
        .expect_err("dial should fail");
    let elapsed = started.elapsed();

    assert!(
        matches!(err, DialError::Connect(_)),
        "expected a non-retryable connect failure, got {err:?}"
    );
    // A single attempt — none of the retry delays may have elapsed.
    assert!(
        elapsed < policy.retry_delay,
        "dial retried a non-retryable error: {elapsed:?}"
    );
}

#[tokio::test]
async fn refused_dial_exhausts_exactly_five_attempts() {
    let port = refused_port().await;
    let policy = test_policy(port);

    let started = Instant::now();
    let err = dial_peer(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST, &policy)
        .await
        .expect_err("dial should fail");
    let elapsed = started.elapsed();

    match err {
        DialError::Exhausted { attempts } => assert_eq!(attempts, 5),
        other => panic!("expected exhaustion, got {other:?}"),
    }
    // Five retryable failures, each followed by the fixed delay.
    assert!(
        elapsed >= Duration::from_millis(50),
        "retries were not separated by the delay: {elapsed:?}"
    );
}
