//! Interactive file-transfer client
//!
//! Prompts on stdout, reads commands from stdin, and talks to one
//! server over a single RUDP session. `get` and `put` move file bytes
//! through KFTP; every other line is sent verbatim and the server's
//! single-frame reply is printed.

use std::fs;
use std::io::{BufRead, Write};
use std::net::SocketAddr;

use tracing::warn;

use crate::constants::MAX_TIMEOUT_RETRIES;
use crate::error::Result;
use crate::kftp;
use crate::rudp::Session;
use crate::transport::Endpoint;

/// Fixed prompt block emitted before each accepted command. The
/// trailing `"> "` marker carries no newline.
pub const PROMPT: &str = "Please enter one of the following messages: \n\
\tget <file_name>\n\
\tput <file_name>\n\
\tdelete <file_name>\n\
\tls\n\
\texit\n\
> ";

/// Interactive client bound to one server address.
#[derive(Debug)]
pub struct FileClient<E: Endpoint> {
    session: Session<E>,
    server: SocketAddr,
}

impl<E: Endpoint> FileClient<E> {
    /// Create a client speaking to `server` over `endpoint`.
    pub fn new(endpoint: E, server: SocketAddr) -> Self {
        Self {
            session: Session::new(endpoint),
            server,
        }
    }

    /// Run the prompt loop until `exit` or end of input.
    pub fn run(&mut self, input: &mut impl BufRead, output: &mut impl Write) -> Result<()> {
        loop {
            output.write_all(PROMPT.as_bytes())?;
            output.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                return Ok(());
            }
            let command = line.strip_suffix('\n').unwrap_or(&line).to_string();
            if command.trim().is_empty() {
                continue;
            }

            match command.split_whitespace().collect::<Vec<_>>().as_slice() {
                ["get", path] => self.get(&command, path)?,
                ["put", path] => self.put(&command, path)?,
                ["exit"] => {
                    self.send_and_print(&command, output)?;
                    return Ok(());
                }
                // Everything else, including malformed get/put, goes to
                // the server untouched; it owns validation.
                _ => self.send_and_print(&command, output)?,
            }
        }
    }

    fn get(&mut self, command: &str, path: &str) -> Result<()> {
        self.session.send_to(command.as_bytes(), self.server)?;

        match self.receive_payload()? {
            Some(contents) => fs::write(path, contents)?,
            None => warn!(path, "server sent no file data"),
        }
        Ok(())
    }

    fn put(&mut self, command: &str, path: &str) -> Result<()> {
        // Read before contacting the server so a bad local path costs
        // no round trip.
        let contents = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path, %e, "cannot read local file");
                return Ok(());
            }
        };

        self.session.send_to(command.as_bytes(), self.server)?;
        kftp::send_to(&mut self.session, &contents, self.server)
    }

    fn send_and_print(&mut self, command: &str, output: &mut impl Write) -> Result<()> {
        self.session.send_to(command.as_bytes(), self.server)?;

        match self.receive_reply()? {
            Some(reply) => {
                output.write_all(&reply)?;
                output.write_all(b"\n")?;
                output.flush()?;
            }
            None => warn!(command, "server sent no reply"),
        }
        Ok(())
    }

    /// One single-frame reply, waiting through at most the sender's
    /// retry budget worth of receive timeouts.
    fn receive_reply(&mut self) -> Result<Option<Vec<u8>>> {
        for _ in 0..=MAX_TIMEOUT_RETRIES {
            if let Some((reply, _)) = self.session.receive_from()? {
                return Ok(Some(reply));
            }
        }
        Ok(None)
    }

    /// One KFTP payload, with the same patience as [`Self::receive_reply`].
    fn receive_payload(&mut self) -> Result<Option<Vec<u8>>> {
        for _ in 0..=MAX_TIMEOUT_RETRIES {
            if let Some((payload, _)) = kftp::receive_from(&mut self.session)? {
                return Ok(Some(payload));
            }
        }
        Ok(None)
    }
}
