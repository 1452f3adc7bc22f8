//! lanlink wire format — the discovery and session text protocols.
//!
//! Both protocols are flat ASCII text. A discovery datagram is
//! `peer:<dotted-quad>`; a session carries one free-text greeting and one
//! free-text acknowledgment, each read in a single bounded read. The
//! constants below are the interoperability contract: every node on a
//! segment must agree on them or the nodes will not find each other.

use std::fmt;
use std::net::Ipv4Addr;

/// UDP port on which presence announcements are sent and received.
pub const DISCOVERY_PORT: u16 = 9999;

/// TCP port on which the inbound server accepts greeting exchanges.
pub const APP_PORT: u16 = 8888;

/// Destination for presence announcements — the all-ones IPv4 broadcast.
pub const BROADCAST_ADDR: Ipv4Addr = Ipv4Addr::BROADCAST;

/// Seconds between presence announcements.
pub const ANNOUNCE_INTERVAL_SECS: u64 = 5;

/// Seconds between connection-manager sweeps of the peer registry.
pub const SWEEP_INTERVAL_SECS: u64 = 10;

/// Total connect attempts per dial before giving up.
pub const MAX_DIAL_ATTEMPTS: u32 = 5;

/// Seconds between connect attempts. Constant — no exponential backoff.
pub const RETRY_DELAY_SECS: u64 = 2;

/// Largest message either side of a session will read. Longer payloads
/// are truncated at the receiver.
pub const MAX_MESSAGE_BYTES: usize = 1024;

/// Prefix that marks a datagram as a presence announcement.
pub const ANNOUNCE_PREFIX: &str = "peer:";

/// Fixed reply the inbound server sends for every received message.
pub const ACK_TEXT: &str = "Message received successfully";

/// A presence announcement: one node advertising its address.
///
/// Unacknowledged and unauthenticated — carries no identity, sequence
/// number, or TTL. Anything on the segment can claim any address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Announcement {
    pub addr: Ipv4Addr,
}

impl Announcement {
    pub fn new(addr: Ipv4Addr) -> Self {
        Self { addr }
    }

    /// Parse a received datagram. Returns `None` for anything that is not
    /// `peer:` followed by a valid dotted-quad — malformed datagrams are
    /// ignored, never an error.
    pub fn parse(payload: &str) -> Option<Self> {
        let suffix = payload.strip_prefix(ANNOUNCE_PREFIX)?;
        let addr = suffix.parse().ok()?;
        Some(Self { addr })
    }
}

impl fmt::Display for Announcement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", ANNOUNCE_PREFIX, self.addr)
    }
}

/// The one greeting a dialer sends after connecting.
pub fn greeting(local_addr: Ipv4Addr) -> String {
    format!("Hello from {local_addr}")
}
