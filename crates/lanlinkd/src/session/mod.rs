//! Greeting sessions — one-shot TCP exchanges between nodes.
//!
//! A session is a single request/reply: the dialer writes one greeting,
//! the server writes one acknowledgment, both sides close. No framing,
//! no versioning, no persistent state.

pub mod dialer;
pub mod server;
