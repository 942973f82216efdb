//! Output module
//!
//! Pushes session updates to clients:
//! - Server-Sent Events (snapshots and spoken cues)

pub mod sse;
