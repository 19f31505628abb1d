//! RUDP wire format
//!
//! A frame is a fixed 12-byte header followed by exactly
//! `header.data_size` payload bytes. All header fields are big-endian,
//! signed, 32 bits wide. The same header carries data frames
//! (`seq_num > 0`) and pure acks (`seq_num == 0`, `data_size == 0`);
//! there is no separate ack frame type.

use static_assertions::const_assert_eq;

use crate::constants::{BUFSIZE, DATASIZE, RUDP_HEADER_SIZE};
use crate::error::{KftpError, Result};

const_assert_eq!(RUDP_HEADER_SIZE, 12);
const_assert_eq!(DATASIZE, BUFSIZE - RUDP_HEADER_SIZE);

/// Fixed RUDP frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RudpHeader {
    /// Sender's sequence number of this data frame; 0 on pure acks
    pub seq_num: i32,
    /// Sequence number being acknowledged; 0 when not acknowledging
    pub ack_num: i32,
    /// Number of payload bytes following the header
    pub data_size: i32,
}

impl RudpHeader {
    /// Encoded size in bytes
    pub const SIZE: usize = RUDP_HEADER_SIZE;

    /// Encode header-first into its fixed wire form.
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&self.seq_num.to_be_bytes());
        buf[4..8].copy_from_slice(&self.ack_num.to_be_bytes());
        buf[8..12].copy_from_slice(&self.data_size.to_be_bytes());
        buf
    }

    /// Decode a header from the front of `data`.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(KftpError::frame(format!(
                "RUDP header needs {} bytes, got {}",
                Self::SIZE,
                data.len()
            )));
        }

        // Slices are length-checked above; into() cannot fail.
        let seq_num = i32::from_be_bytes(data[0..4].try_into().unwrap());
        let ack_num = i32::from_be_bytes(data[4..8].try_into().unwrap());
        let data_size = i32::from_be_bytes(data[8..12].try_into().unwrap());

        Ok(Self {
            seq_num,
            ack_num,
            data_size,
        })
    }
}

/// One RUDP frame: header plus payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RudpMessage {
    /// Frame header
    pub header: RudpHeader,
    /// Payload; its length always equals `header.data_size`
    pub data: Vec<u8>,
}

impl RudpMessage {
    /// Build a data frame carrying `payload` under sequence number `seq_num`.
    pub fn data(seq_num: i32, payload: Vec<u8>) -> Self {
        Self {
            header: RudpHeader {
                seq_num,
                ack_num: 0,
                data_size: payload.len() as i32,
            },
            data: payload,
        }
    }

    /// Build a pure-ack frame acknowledging `ack_num`.
    pub fn ack(ack_num: i32) -> Self {
        Self {
            header: RudpHeader {
                seq_num: 0,
                ack_num,
                data_size: 0,
            },
            data: Vec::new(),
        }
    }

    /// Whether this frame carries no payload and only acknowledges.
    pub fn is_ack(&self) -> bool {
        self.header.seq_num == 0 && self.header.data_size == 0
    }

    /// Encode header-first into wire form.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(RudpHeader::SIZE + self.data.len());
        buf.extend_from_slice(&self.header.encode());
        buf.extend_from_slice(&self.data);
        buf
    }

    /// Decode a complete frame, rejecting any datagram whose trailing
    /// byte count disagrees with the declared `data_size`.
    pub fn decode(frame: &[u8]) -> Result<Self> {
        let header = RudpHeader::decode(frame)?;
        let payload = &frame[RudpHeader::SIZE..];

        if header.data_size < 0 {
            return Err(KftpError::frame(format!(
                "negative RUDP data_size {}",
                header.data_size
            )));
        }
        if header.data_size as usize != payload.len() {
            return Err(KftpError::frame(format!(
                "RUDP data_size {} disagrees with {} payload bytes",
                header.data_size,
                payload.len()
            )));
        }

        Ok(Self {
            header,
            data: payload.to_vec(),
        })
    }
}
