//! lanlinkd — LAN peer discovery and connection-management daemon.
//!
//! Exposed as a library so the integration tests can drive the discovery
//! and session components in-process; the binary in `main.rs` is a thin
//! wiring layer over these modules.

pub mod discovery;
pub mod session;
