//! Shared end-to-end test harness: a protocol-level test client and a
//! spawned server process with its own scratch working directory.

// Each integration test binary compiles this module and uses a subset.
#![allow(dead_code)]

use std::net::{SocketAddr, UdpSocket};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use tempfile::TempDir;

use kftp::constants::MAX_TIMEOUT_RETRIES;
use kftp::rudp::Session;
use kftp::transport::{Endpoint, EndpointConfig, UdpEndpoint};

/// Receive timeout used by test clients.
pub const CLIENT_RECV_TIMEOUT: Duration = Duration::from_millis(300);

/// Bind a fresh client endpoint on an ephemeral loopback port.
pub fn client_endpoint() -> UdpEndpoint {
    UdpEndpoint::new(&EndpointConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        recv_timeout: CLIENT_RECV_TIMEOUT,
    })
    .expect("binding client endpoint")
}

/// Protocol-level client for driving a server in tests.
pub struct TestClient<E: Endpoint> {
    session: Session<E>,
    server: SocketAddr,
}

impl<E: Endpoint> TestClient<E> {
    pub fn new(endpoint: E, server: SocketAddr) -> Self {
        Self {
            session: Session::new(endpoint),
            server,
        }
    }

    pub fn get(&mut self, path: &str) -> Vec<u8> {
        self.send(format!("get {path}").as_bytes());
        self.receive_payload()
    }

    pub fn put(&mut self, path: &str, data: &[u8]) {
        self.send(format!("put {path}").as_bytes());
        kftp::kftp::send_to(&mut self.session, data, self.server).expect("kftp send");
    }

    pub fn delete(&mut self, path: &str) -> Vec<u8> {
        self.send_and_receive(format!("delete {path}").as_bytes())
    }

    pub fn ls(&mut self) -> Vec<u8> {
        self.send_and_receive(b"ls")
    }

    pub fn exit(&mut self) -> Vec<u8> {
        self.send_and_receive(b"exit")
    }

    pub fn send(&mut self, data: &[u8]) {
        self.session.send_to(data, self.server).expect("rudp send");
    }

    pub fn send_and_receive(&mut self, data: &[u8]) -> Vec<u8> {
        self.send(data);
        self.receive()
    }

    fn receive(&mut self) -> Vec<u8> {
        for _ in 0..=MAX_TIMEOUT_RETRIES {
            if let Some((reply, _)) = self.session.receive_from().expect("rudp receive") {
                return reply;
            }
        }
        panic!("server sent no reply");
    }

    fn receive_payload(&mut self) -> Vec<u8> {
        for _ in 0..=MAX_TIMEOUT_RETRIES {
            if let Some((payload, _)) =
                kftp::kftp::receive_from(&mut self.session).expect("kftp receive")
            {
                return payload;
            }
        }
        panic!("server sent no payload");
    }
}

/// A `server` binary running against a scratch working directory.
/// Killed on drop; the directory disappears with it.
pub struct ServerProcess {
    child: Child,
    addr: SocketAddr,
    dir: TempDir,
}

impl ServerProcess {
    pub fn spawn() -> Self {
        let dir = tempfile::tempdir().expect("creating scratch dir");
        Self::spawn_in(dir)
    }

    fn spawn_in(dir: TempDir) -> Self {
        // Reserve an ephemeral port, then hand it to the server. The
        // tiny rebind race is acceptable in tests.
        let port = {
            let probe = UdpSocket::bind("127.0.0.1:0").expect("probing for a free port");
            probe.local_addr().unwrap().port()
        };

        let child = Command::new(env!("CARGO_BIN_EXE_server"))
            .arg(port.to_string())
            .current_dir(dir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawning server binary");

        // The first command's retransmit budget papers over any bind
        // delay, but give the process a head start anyway.
        std::thread::sleep(Duration::from_millis(200));

        Self {
            child,
            addr: format!("127.0.0.1:{port}").parse().unwrap(),
            dir,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file into the server's working directory.
    pub fn seed_file(&self, name: &str, contents: &[u8]) {
        std::fs::write(self.dir.path().join(name), contents).expect("seeding file");
    }

    /// Wait up to `deadline` for the server to exit; returns its status
    /// code if it did.
    pub fn wait_for_exit(&mut self, deadline: Duration) -> Option<i32> {
        let step = Duration::from_millis(10);
        let mut waited = Duration::ZERO;
        while waited <= deadline {
            if let Some(status) = self.child.try_wait().expect("polling server process") {
                return status.code();
            }
            std::thread::sleep(step);
            waited += step;
        }
        None
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
