//! Deterministic fault-injecting endpoint for loss and corruption tests

use std::net::SocketAddr;

use tracing::trace;

use crate::error::Result;
use crate::transport::Endpoint;

/// Wraps an endpoint with deterministic packet damage: every outbound
/// frame is transmitted twice, first with all bits flipped and then
/// intact, and every second inbound frame is dropped.
///
/// The flipped duplicate exercises the peer's corrupt-frame rejection;
/// the inbound drops exercise the retransmit path. A wrapper rather than
/// a socket of its own, so the choice of faulty vs. faithful transport
/// is made at build time by the caller.
#[derive(Debug)]
pub struct LossyEndpoint<E: Endpoint> {
    inner: E,
    recv_count: u64,
}

impl<E: Endpoint> LossyEndpoint<E> {
    /// Wrap `inner` with fault injection.
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            recv_count: 0,
        }
    }

    /// Access the wrapped endpoint.
    pub fn inner(&self) -> &E {
        &self.inner
    }
}

impl<E: Endpoint> Endpoint for LossyEndpoint<E> {
    fn send_to(&mut self, frame: &[u8], peer: SocketAddr) -> Result<()> {
        let flipped: Vec<u8> = frame.iter().map(|b| b ^ 0xff).collect();
        trace!(len = frame.len(), "sending bit-flipped duplicate");
        self.inner.send_to(&flipped, peer)?;
        self.inner.send_to(frame, peer)
    }

    fn recv(&mut self, max_len: usize) -> Result<Option<(Vec<u8>, SocketAddr)>> {
        if self.recv_count % 2 == 0 {
            // Swallow one frame, simulating a lost response. A timeout
            // while discarding is still a timeout for the caller.
            match self.inner.recv(max_len)? {
                Some((frame, addr)) => {
                    self.recv_count += 1;
                    trace!(len = frame.len(), %addr, "dropped inbound frame");
                }
                None => return Ok(None),
            }
        }

        let received = self.inner.recv(max_len)?;
        if received.is_some() {
            self.recv_count += 1;
        }
        Ok(received)
    }
}
