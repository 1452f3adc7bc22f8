//! lanlink-core — shared types, discovery wire format, and configuration.
//! All other lanlink crates depend on this one.

pub mod config;
pub mod netif;
pub mod registry;
pub mod wire;

pub use registry::PeerRegistry;
