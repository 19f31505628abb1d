//! kftp - file transfer over reliable UDP
//!
//! Two thin protocols layered on plain datagrams:
//! 1. RUDP: stop-and-wait reliability for single messages (retransmit,
//!    ack, duplicate suppression)
//! 2. KFTP: length-prefixed segmentation so whole files can ride RUDP
//!
//! On top of them sit a five-command file server (`get`, `put`,
//! `delete`, `ls`, `exit`) and a matching interactive client.

pub mod client;
pub mod constants;
pub mod error;
pub mod kftp;
pub mod rudp;
pub mod server;
pub mod transport;

// Re-export main components
pub use client::FileClient;
pub use error::{KftpError, Result};
pub use rudp::{RudpHeader, RudpMessage, Session};
pub use server::FileServer;
pub use transport::{Endpoint, EndpointConfig, LossyEndpoint, UdpEndpoint};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
