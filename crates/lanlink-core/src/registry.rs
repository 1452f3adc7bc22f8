//! Peer registry — the shared set of discovered peer addresses.
//!
//! Written by the discovery listener, read by the connection manager.
//! One mutex guards the set; it is held only for the insert or the
//! snapshot copy, never across a network operation, so a slow peer can
//! never stall discovery.
//!
//! Entries are never removed. A peer that vanishes stays in the set for
//! the process lifetime and simply fails its dials.

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared handle to the peer set. Cheap to clone — all clones see the
/// same underlying set. Constructed once at startup and injected into
/// the listener and the connection manager.
#[derive(Debug, Clone, Default)]
pub struct PeerRegistry {
    inner: Arc<Mutex<HashSet<Ipv4Addr>>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a discovered peer. Returns true if the peer was not already
    /// known; re-announcements are idempotent no-ops.
    pub fn insert(&self, addr: Ipv4Addr) -> bool {
        self.lock().insert(addr)
    }

    /// Copy the current peer set. The lock is released before the copy is
    /// returned, so callers are free to dial at their leisure.
    pub fn snapshot(&self) -> Vec<Ipv4Addr> {
        self.lock().iter().copied().collect()
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        self.lock().contains(&addr)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<Ipv4Addr>> {
        // A panic while holding the lock poisons it; the set itself is
        // still coherent, so keep going with the inner value.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
