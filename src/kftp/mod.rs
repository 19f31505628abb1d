//! KFTP: length-prefixed segmentation over RUDP
//!
//! Lets arbitrarily sized byte payloads ride the single-frame RUDP
//! protocol. The first RUDP payload opens with a 4-byte big-endian
//! signed length header; the declared number of payload bytes follows
//! across as many RUDP frames as it takes, each individually acked.

use std::net::SocketAddr;

use tracing::debug;

use crate::constants::{DATASIZE, KFTP_HEADER_SIZE, MAX_TIMEOUT_RETRIES};
use crate::error::{KftpError, Result};
use crate::rudp::Session;
use crate::transport::Endpoint;

/// Fixed KFTP length header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KftpHeader {
    /// Total length in bytes of the logical payload that follows
    pub data_size: i32,
}

impl KftpHeader {
    /// Encoded size in bytes
    pub const SIZE: usize = KFTP_HEADER_SIZE;

    /// Encode into the fixed wire form.
    pub fn encode(&self) -> [u8; Self::SIZE] {
        self.data_size.to_be_bytes()
    }

    /// Decode from the front of the first fragment. Negative lengths
    /// are a framing error.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(KftpError::frame(format!(
                "KFTP header needs {} bytes, got {}",
                Self::SIZE,
                data.len()
            )));
        }

        let data_size = i32::from_be_bytes(data[0..4].try_into().unwrap());
        if data_size < 0 {
            return Err(KftpError::frame(format!(
                "negative KFTP length {data_size}"
            )));
        }

        Ok(Self { data_size })
    }
}

/// Send `payload` to `peer`, split into RUDP-sized fragments.
///
/// The first fragment carries the length header plus up to
/// `DATASIZE - 4` payload bytes; every later fragment carries up to
/// `DATASIZE` bytes. Each fragment is delivered through the session's
/// reliable send and is therefore individually acknowledged.
pub fn send_to<E: Endpoint>(
    session: &mut Session<E>,
    payload: &[u8],
    peer: SocketAddr,
) -> Result<()> {
    if payload.len() > i32::MAX as usize {
        return Err(KftpError::frame(format!(
            "payload of {} bytes exceeds the KFTP length field",
            payload.len()
        )));
    }

    let header = KftpHeader {
        data_size: payload.len() as i32,
    }
    .encode();

    if header.len() + payload.len() <= DATASIZE {
        let mut first = Vec::with_capacity(header.len() + payload.len());
        first.extend_from_slice(&header);
        first.extend_from_slice(payload);
        return session.send_to(&first, peer);
    }

    let mut offset = DATASIZE - header.len();
    let mut first = Vec::with_capacity(DATASIZE);
    first.extend_from_slice(&header);
    first.extend_from_slice(&payload[..offset]);
    session.send_to(&first, peer)?;

    while offset < payload.len() {
        let end = usize::min(offset + DATASIZE, payload.len());
        session.send_to(&payload[offset..end], peer)?;
        offset = end;
    }

    Ok(())
}

/// Reassemble one KFTP payload.
///
/// The first fragment fixes the sending peer; fragments arriving from
/// anyone else are discarded. Returns `Ok(None)` when no first fragment
/// arrives within the endpoint timeout. Once mid-payload,
/// `MAX_TIMEOUT_RETRIES + 1` consecutive timeouts abort the reassembly
/// instead of waiting forever on a vanished peer.
pub fn receive_from<E: Endpoint>(
    session: &mut Session<E>,
) -> Result<Option<(Vec<u8>, SocketAddr)>> {
    let (first, peer) = match session.receive_from()? {
        Some(received) => received,
        None => return Ok(None),
    };

    let header = KftpHeader::decode(&first)?;
    let expected = header.data_size as usize;
    let mut payload = first[KftpHeader::SIZE..].to_vec();
    let mut idle_timeouts = 0u32;

    while payload.len() < expected {
        match session.receive_from()? {
            Some((fragment, from)) if from == peer => {
                idle_timeouts = 0;
                payload.extend_from_slice(&fragment);
            }
            Some((_, from)) => {
                debug!(%from, %peer, "discarding fragment from foreign peer");
                idle_timeouts = 0;
            }
            None => {
                idle_timeouts += 1;
                if idle_timeouts > MAX_TIMEOUT_RETRIES {
                    debug!(
                        got = payload.len(),
                        expected, "peer went quiet mid-payload"
                    );
                    return Err(KftpError::AckTimeout {
                        retries: MAX_TIMEOUT_RETRIES,
                    });
                }
            }
        }
    }

    Ok(Some((payload, peer)))
}
