//! Protocol constants shared by the RUDP and KFTP layers
//!
//! This module contains the wire-format sizes and timing values used
//! throughout the kftp library.

use std::time::Duration;

/// Maximum on-wire size of a single RUDP frame (header + payload)
pub const BUFSIZE: usize = 1024;

/// Size of the fixed RUDP header (seq_num, ack_num, data_size; big-endian i32 each)
pub const RUDP_HEADER_SIZE: usize = 12;

/// Maximum payload bytes carried by one RUDP frame
pub const DATASIZE: usize = BUFSIZE - RUDP_HEADER_SIZE;

/// Size of the fixed KFTP length header (big-endian i32)
pub const KFTP_HEADER_SIZE: usize = 4;

/// Number of retransmissions a sender attempts after the initial send.
/// The sixth consecutive timeout fails the operation.
pub const MAX_TIMEOUT_RETRIES: u32 = 5;

/// Default endpoint receive timeout. Gates both the sender's retransmit
/// loop and the server's idle wakeups.
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_millis(500);
