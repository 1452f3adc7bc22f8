//! Presence discovery — periodic broadcast out, passive listening in.

pub mod broadcast;
pub mod listener;
