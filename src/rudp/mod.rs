//! RUDP: minimal reliable, in-order datagram protocol
//!
//! Single-message reliability over an unreliable endpoint:
//! - Stop-and-wait acknowledgement with retransmit-on-timeout
//! - Duplicate suppression and re-acking on the receive side
//! - Silent rejection of corrupt or out-of-window frames
//!
//! Not the IETF RUDP draft. One [`Session`] pairs the sender and
//! receiver halves over a shared endpoint.

pub mod header;
pub mod session;

pub use header::{RudpHeader, RudpMessage};
pub use session::Session;
