//! Request dispatcher for the file server
//!
//! Reads one textual command at a time over RUDP, validates it, and
//! routes it to a filesystem handler. Bulk payloads (`get`/`put`) ride
//! KFTP; single-frame replies (`delete`, `ls`, `exit`, errors) use RUDP
//! directly. One request is served at a time.

use std::fs;
use std::net::SocketAddr;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::kftp;
use crate::rudp::Session;
use crate::transport::Endpoint;

/// Reply to a successful `delete`
pub const DELETED_REPLY: &str = "Deleted file\n";

/// Reply to `exit`, sent just before shutdown
pub const EXIT_REPLY: &str = "Exiting gracefully";

/// Reply to a request that fails validation
pub fn invalid_reply(original: &str) -> String {
    format!("Invalid command: {original}")
}

/// A parsed client request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Send the named file to the requester over KFTP
    Get(String),
    /// Receive a KFTP payload and store it under the named path
    Put(String),
    /// Remove the named file
    Delete(String),
    /// List plain files in the working directory
    Ls,
    /// Acknowledge and shut down
    Exit,
    /// Anything that fails validation, carrying the normalised text
    Invalid(String),
}

impl Command {
    /// Parse one request line. A single trailing newline is stripped
    /// before tokenizing; unknown commands and wrong arities collapse
    /// into [`Command::Invalid`].
    pub fn parse(raw: &str) -> Self {
        let normalised = raw.strip_suffix('\n').unwrap_or(raw);

        match normalised.split_whitespace().collect::<Vec<_>>().as_slice() {
            ["get", path] => Command::Get((*path).to_string()),
            ["put", path] => Command::Put((*path).to_string()),
            ["delete", path] => Command::Delete((*path).to_string()),
            ["ls"] => Command::Ls,
            ["exit"] => Command::Exit,
            _ => Command::Invalid(normalised.to_string()),
        }
    }
}

/// Single-client file server over one RUDP session.
///
/// Serves `get`, `put`, `delete`, `ls`, and `exit` against the process
/// working directory until `exit` arrives.
#[derive(Debug)]
pub struct FileServer<E: Endpoint> {
    session: Session<E>,
}

impl<E: Endpoint> FileServer<E> {
    /// Create a server speaking over `endpoint`.
    pub fn new(endpoint: E) -> Self {
        Self {
            session: Session::new(endpoint),
        }
    }

    /// Serve requests until an `exit` command has been acknowledged.
    ///
    /// Errors scoped to a single request (a client that vanishes
    /// mid-transfer, an unreadable file) are logged and the loop keeps
    /// serving; only unrecoverable errors propagate.
    pub fn run(&mut self) -> Result<()> {
        info!("serving files from the working directory");

        loop {
            let (request, peer) = match self.session.receive_from()? {
                Some(received) => received,
                None => continue,
            };

            let text = String::from_utf8_lossy(&request).into_owned();
            let command = Command::parse(&text);
            debug!(?command, %peer, "dispatching request");

            let outcome = match command {
                Command::Get(path) => self.handle_get(&path, peer),
                Command::Put(path) => self.handle_put(&path),
                Command::Delete(path) => self.handle_delete(&path, peer),
                Command::Ls => self.handle_ls(peer),
                Command::Invalid(original) => self.handle_invalid(&original, peer),
                Command::Exit => {
                    if let Err(e) = self.session.send_to(EXIT_REPLY.as_bytes(), peer) {
                        warn!(%e, "exit reply was not acknowledged");
                    }
                    info!("exiting gracefully");
                    return Ok(());
                }
            };

            if let Err(e) = outcome {
                if e.is_recoverable() {
                    warn!(%e, "request failed, continuing to serve");
                } else {
                    return Err(e);
                }
            }
        }
    }

    fn handle_get(&mut self, path: &str, peer: SocketAddr) -> Result<()> {
        // Unreadable files get an empty payload rather than an error
        // reply; the requester still sees a well-formed KFTP stream.
        let contents = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(path, %e, "get of unreadable file, replying with empty payload");
                Vec::new()
            }
        };

        info!(path, len = contents.len(), "sending file");
        kftp::send_to(&mut self.session, &contents, peer)
    }

    fn handle_put(&mut self, path: &str) -> Result<()> {
        match kftp::receive_from(&mut self.session)? {
            Some((contents, _)) => {
                fs::write(path, &contents)?;
                info!(path, len = contents.len(), "stored file");
                Ok(())
            }
            None => {
                warn!(path, "no payload followed the put command");
                Ok(())
            }
        }
    }

    fn handle_delete(&mut self, path: &str, peer: SocketAddr) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => {
                info!(path, "deleted file");
                self.session.send_to(DELETED_REPLY.as_bytes(), peer)
            }
            Err(e) => {
                debug!(path, %e, "delete failed, replying with empty payload");
                self.session.send_to(&[], peer)
            }
        }
    }

    fn handle_ls(&mut self, peer: SocketAddr) -> Result<()> {
        let mut names = Vec::new();
        for entry in fs::read_dir(".")? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        self.session.send_to(names.join("\n").as_bytes(), peer)
    }

    fn handle_invalid(&mut self, original: &str, peer: SocketAddr) -> Result<()> {
        debug!(original, "rejecting invalid command");
        self.session
            .send_to(invalid_reply(original).as_bytes(), peer)
    }
}
