//! RUDP session: paired sender and receiver halves over one endpoint
//!
//! The sender half transmits one data frame at a time and blocks until
//! it is acknowledged or the retry budget runs out. The receiver half
//! delivers each unique in-order frame exactly once and owns all
//! outgoing acks. Both halves share the endpoint and the per-peer
//! counters, so they live in one object; the sender asks the receiver
//! half to re-ack peer retransmissions it observes while waiting.

use std::net::SocketAddr;

use tracing::{debug, trace};

use crate::constants::{BUFSIZE, DATASIZE, MAX_TIMEOUT_RETRIES};
use crate::error::{KftpError, Result};
use crate::rudp::header::RudpMessage;
use crate::transport::Endpoint;

/// Reliable-delivery state for one endpoint.
///
/// `last_sent_seq` is the most recently acknowledged outgoing sequence
/// number; `last_received_seq` the most recently delivered incoming one.
/// Both start at 0 and only ever grow. There is no teardown handshake;
/// dropping the session drops the state.
#[derive(Debug)]
pub struct Session<E: Endpoint> {
    endpoint: E,
    last_sent_seq: i32,
    last_received_seq: i32,
}

impl<E: Endpoint> Session<E> {
    /// Create a session over `endpoint` with fresh counters.
    pub fn new(endpoint: E) -> Self {
        Self {
            endpoint,
            last_sent_seq: 0,
            last_received_seq: 0,
        }
    }

    /// The underlying endpoint.
    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    /// Most recently acknowledged outgoing sequence number.
    pub fn last_sent_seq(&self) -> i32 {
        self.last_sent_seq
    }

    /// Most recently delivered incoming sequence number.
    pub fn last_received_seq(&self) -> i32 {
        self.last_received_seq
    }

    /// Send one data frame to `peer` and block until the peer
    /// acknowledges it.
    ///
    /// The frame is retransmitted only when the endpoint's receive times
    /// out, at most [`MAX_TIMEOUT_RETRIES`] times after the initial
    /// transmission; the next timeout fails with
    /// [`KftpError::AckTimeout`]. Frames from other addresses, stray
    /// acks, and undecodable datagrams are discarded without
    /// retransmitting. A retransmitted peer data frame observed while
    /// waiting is re-acked on behalf of the receiver half.
    pub fn send_to(&mut self, payload: &[u8], peer: SocketAddr) -> Result<()> {
        if payload.len() > DATASIZE {
            return Err(KftpError::frame(format!(
                "payload of {} bytes exceeds the {} byte frame limit",
                payload.len(),
                DATASIZE
            )));
        }

        let seq_num = self.last_sent_seq + 1;
        let frame = RudpMessage::data(seq_num, payload.to_vec()).encode();
        let mut retries = 0u32;

        self.endpoint.send_to(&frame, peer)?;
        loop {
            let (buf, addr) = match self.endpoint.recv(BUFSIZE)? {
                Some(received) => received,
                None => {
                    if retries >= MAX_TIMEOUT_RETRIES {
                        debug!(seq_num, retries, "retry budget exhausted");
                        return Err(KftpError::AckTimeout { retries });
                    }
                    retries += 1;
                    debug!(seq_num, retries, "timeout waiting for ack, retransmitting");
                    self.endpoint.send_to(&frame, peer)?;
                    continue;
                }
            };

            if addr != peer {
                trace!(%addr, "ignoring frame from foreign address");
                continue;
            }

            let message = match RudpMessage::decode(&buf) {
                Ok(message) => message,
                Err(e) => {
                    debug!(%e, "dropping undecodable frame");
                    continue;
                }
            };

            if message.header.ack_num == seq_num {
                trace!(seq_num, "acknowledged");
                self.last_sent_seq = seq_num;
                return Ok(());
            }

            if message.header.seq_num != 0 && message.header.seq_num == self.last_received_seq {
                // The peer is retransmitting a frame we already
                // delivered; its ack must have been lost.
                trace!(seq_num = message.header.seq_num, "re-acking peer retransmission");
                self.send_ack(self.last_received_seq, addr)?;
                continue;
            }

            trace!(
                seq_num = message.header.seq_num,
                ack_num = message.header.ack_num,
                "ignoring stray frame while awaiting ack"
            );
        }
    }

    /// Wait for the next in-order data frame.
    ///
    /// Returns `Ok(None)` when the endpoint's receive timeout elapses
    /// with nothing deliverable, so callers can interleave other work.
    /// Each delivered frame is acked to its sender; a duplicate of the
    /// previously delivered frame is re-acked without being delivered
    /// again; everything else (pure acks, corrupt frames, out-of-window
    /// sequence numbers) is dropped silently.
    pub fn receive_from(&mut self) -> Result<Option<(Vec<u8>, SocketAddr)>> {
        loop {
            let (buf, addr) = match self.endpoint.recv(BUFSIZE)? {
                Some(received) => received,
                None => return Ok(None),
            };

            let message = match RudpMessage::decode(&buf) {
                Ok(message) => message,
                Err(e) => {
                    debug!(%e, "dropping undecodable frame");
                    continue;
                }
            };

            let expected = self.last_received_seq + 1;
            if message.header.seq_num == expected {
                self.last_received_seq = expected;
                self.send_ack(expected, addr)?;
                trace!(seq_num = expected, %addr, "delivered");
                return Ok(Some((message.data, addr)));
            }

            if message.header.seq_num != 0 && message.header.seq_num == self.last_received_seq {
                // Duplicate of the last delivery: its ack was lost, so
                // ack again but deliver nothing.
                trace!(seq_num = message.header.seq_num, "re-acking duplicate");
                self.send_ack(self.last_received_seq, addr)?;
                continue;
            }

            trace!(
                seq_num = message.header.seq_num,
                ack_num = message.header.ack_num,
                "dropping out-of-window frame"
            );
        }
    }

    /// Emit a pure-ack frame. Acks ride the endpoint directly and are
    /// never themselves acknowledged.
    fn send_ack(&mut self, ack_num: i32, peer: SocketAddr) -> Result<()> {
        self.endpoint.send_to(&RudpMessage::ack(ack_num).encode(), peer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::net::SocketAddr;

    /// Endpoint double fed from a script. An exhausted script reads as
    /// an endless run of receive timeouts.
    struct ScriptedEndpoint {
        inbound: VecDeque<Option<(Vec<u8>, SocketAddr)>>,
        sent: Vec<(Vec<u8>, SocketAddr)>,
    }

    impl ScriptedEndpoint {
        fn new(inbound: Vec<Option<(Vec<u8>, SocketAddr)>>) -> Self {
            Self {
                inbound: inbound.into(),
                sent: Vec::new(),
            }
        }

        fn sent_messages(&self) -> Vec<RudpMessage> {
            self.sent
                .iter()
                .map(|(frame, _)| RudpMessage::decode(frame).unwrap())
                .collect()
        }
    }

    impl Endpoint for ScriptedEndpoint {
        fn send_to(&mut self, frame: &[u8], peer: SocketAddr) -> Result<()> {
            self.sent.push((frame.to_vec(), peer));
            Ok(())
        }

        fn recv(&mut self, _max_len: usize) -> Result<Option<(Vec<u8>, SocketAddr)>> {
            Ok(self.inbound.pop_front().flatten())
        }
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:9001".parse().unwrap()
    }

    fn other_peer() -> SocketAddr {
        "127.0.0.1:9002".parse().unwrap()
    }

    fn data_frame(seq: i32, payload: &[u8]) -> Option<(Vec<u8>, SocketAddr)> {
        Some((RudpMessage::data(seq, payload.to_vec()).encode(), peer()))
    }

    fn ack_frame(ack: i32) -> Option<(Vec<u8>, SocketAddr)> {
        Some((RudpMessage::ack(ack).encode(), peer()))
    }

    #[test]
    fn test_receive_delivers_and_acks() {
        let mut session = Session::new(ScriptedEndpoint::new(vec![data_frame(1, b"hi")]));

        let (payload, addr) = session.receive_from().unwrap().unwrap();
        assert_eq!(payload, b"hi");
        assert_eq!(addr, peer());
        assert_eq!(session.last_received_seq(), 1);

        let sent = session.endpoint().sent_messages();
        assert_eq!(sent, vec![RudpMessage::ack(1)]);
    }

    #[test]
    fn test_receive_duplicate_delivers_once_acks_twice() {
        let mut session = Session::new(ScriptedEndpoint::new(vec![
            data_frame(1, b"hi"),
            data_frame(1, b"hi"),
        ]));

        assert!(session.receive_from().unwrap().is_some());
        // The duplicate is swallowed; the script then runs dry (timeout).
        assert!(session.receive_from().unwrap().is_none());
        assert_eq!(session.last_received_seq(), 1);

        let sent = session.endpoint().sent_messages();
        assert_eq!(sent, vec![RudpMessage::ack(1), RudpMessage::ack(1)]);
    }

    #[test]
    fn test_receive_sequence_is_monotonic() {
        let mut session = Session::new(ScriptedEndpoint::new(vec![
            data_frame(1, b"a"),
            data_frame(2, b"b"),
            data_frame(3, b"c"),
        ]));

        for expected in [&b"a"[..], b"b", b"c"] {
            let (payload, _) = session.receive_from().unwrap().unwrap();
            assert_eq!(payload, expected);
        }
        assert_eq!(session.last_received_seq(), 3);
    }

    #[test]
    fn test_receive_drops_garbage_silently() {
        let mut session = Session::new(ScriptedEndpoint::new(vec![
            // Out-of-window data frame.
            data_frame(5, b"early"),
            // Bit-flipped datagram: decodes to nothing sensible.
            Some((vec![0xff; 40], peer())),
            // Pure ack; receivers never deliver those.
            ack_frame(1),
        ]));

        assert!(session.receive_from().unwrap().is_none());
        assert_eq!(session.last_received_seq(), 0);
        assert!(session.endpoint().sent.is_empty());
    }

    #[test]
    fn test_receive_timeout_sentinel() {
        let mut session = Session::new(ScriptedEndpoint::new(vec![None]));
        assert!(session.receive_from().unwrap().is_none());
    }

    #[test]
    fn test_send_success_on_ack() {
        let mut session = Session::new(ScriptedEndpoint::new(vec![ack_frame(1)]));

        session.send_to(b"payload", peer()).unwrap();
        assert_eq!(session.last_sent_seq(), 1);

        let sent = session.endpoint().sent_messages();
        assert_eq!(sent, vec![RudpMessage::data(1, b"payload".to_vec())]);
    }

    #[test]
    fn test_send_retransmits_on_timeout_only() {
        let mut session = Session::new(ScriptedEndpoint::new(vec![
            None,
            // Stray ack for some other sequence number: no resend.
            ack_frame(99),
            ack_frame(1),
        ]));

        session.send_to(b"payload", peer()).unwrap();

        // Initial transmission plus exactly one timeout-driven resend.
        let sent = session.endpoint().sent_messages();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|m| m.header.seq_num == 1));
    }

    #[test]
    fn test_send_fails_after_retry_budget() {
        let mut session = Session::new(ScriptedEndpoint::new(vec![]));

        let err = session.send_to(b"payload", peer()).unwrap_err();
        assert!(matches!(err, KftpError::AckTimeout { retries: 5 }));
        assert_eq!(session.last_sent_seq(), 0);

        // One initial transmission plus five retries.
        assert_eq!(session.endpoint().sent.len(), 6);
    }

    #[test]
    fn test_send_ignores_foreign_addresses() {
        let mut session = Session::new(ScriptedEndpoint::new(vec![
            Some((RudpMessage::ack(1).encode(), other_peer())),
            ack_frame(1),
        ]));

        session.send_to(b"payload", peer()).unwrap();
        assert_eq!(session.endpoint().sent.len(), 1);
    }

    #[test]
    fn test_send_reacks_peer_retransmission_while_waiting() {
        let mut session = Session::new(ScriptedEndpoint::new(vec![
            // Receiver half delivers seq 1 first.
            data_frame(1, b"request"),
            // Then, during the ack wait, the peer retransmits seq 1
            // because our ack to it was lost.
            data_frame(1, b"request"),
            ack_frame(1),
        ]));

        assert!(session.receive_from().unwrap().is_some());
        session.send_to(b"response", peer()).unwrap();

        let sent = session.endpoint().sent_messages();
        assert_eq!(
            sent,
            vec![
                RudpMessage::ack(1),
                RudpMessage::data(1, b"response".to_vec()),
                RudpMessage::ack(1),
            ]
        );
    }

    #[test]
    fn test_send_rejects_oversized_payload() {
        let mut session = Session::new(ScriptedEndpoint::new(vec![]));
        let err = session.send_to(&vec![0u8; DATASIZE + 1], peer()).unwrap_err();
        assert!(matches!(err, KftpError::Frame { .. }));
        assert!(session.endpoint().sent.is_empty());
    }
}
