//! Datagram endpoint layer
//!
//! This module provides the unreliable send/receive primitive the RUDP
//! protocol is built on:
//! - Fire-and-forget datagram sends to a peer address
//! - Blocking receive bounded by a configurable timeout
//! - A swappable fault-injecting endpoint for loss/corruption tests
//!
//! No reordering, deduplication, or delivery guarantees live here; those
//! are the job of [`crate::rudp`].

use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use tracing::trace;

use crate::constants::DEFAULT_RECV_TIMEOUT;
use crate::error::{KftpError, Result};

pub mod lossy;

pub use lossy::LossyEndpoint;

/// An unreliable datagram endpoint.
///
/// `recv` returning `Ok(None)` is the timeout sentinel: no datagram
/// arrived within the endpoint's receive timeout. Implementations must
/// not block past that timeout.
pub trait Endpoint {
    /// Attempt to deliver one datagram to `peer`. Transient network
    /// failures are reported to the caller, not retried here.
    fn send_to(&mut self, frame: &[u8], peer: SocketAddr) -> Result<()>;

    /// Wait for one datagram of at most `max_len` bytes.
    fn recv(&mut self, max_len: usize) -> Result<Option<(Vec<u8>, SocketAddr)>>;
}

/// Endpoint configuration
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Local address to bind to
    pub bind_addr: String,
    /// Receive timeout; gates retransmits and idle server wakeups
    pub recv_timeout: Duration,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:0".to_string(),
            recv_timeout: DEFAULT_RECV_TIMEOUT,
        }
    }
}

/// Datagram endpoint over an OS UDP socket
#[derive(Debug)]
pub struct UdpEndpoint {
    socket: UdpSocket,
}

impl UdpEndpoint {
    /// Bind a new endpoint according to `config`.
    pub fn new(config: &EndpointConfig) -> Result<Self> {
        if config.recv_timeout.is_zero() {
            return Err(KftpError::config("recv_timeout must be non-zero"));
        }

        let socket = UdpSocket::bind(&config.bind_addr)?;
        socket.set_read_timeout(Some(config.recv_timeout))?;

        Ok(Self { socket })
    }

    /// The local address this endpoint is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

impl Endpoint for UdpEndpoint {
    fn send_to(&mut self, frame: &[u8], peer: SocketAddr) -> Result<()> {
        self.socket.send_to(frame, peer)?;
        trace!(len = frame.len(), %peer, "sent datagram");
        Ok(())
    }

    fn recv(&mut self, max_len: usize) -> Result<Option<(Vec<u8>, SocketAddr)>> {
        let mut buf = vec![0u8; max_len];

        match self.socket.recv_from(&mut buf) {
            Ok((len, addr)) => {
                buf.truncate(len);
                trace!(len, %addr, "received datagram");
                Ok(Some((buf, addr)))
            }
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                Ok(None)
            }
            Err(e) => Err(KftpError::Io(e)),
        }
    }
}
