//! Interactive client binary: `client <address> <port>`

use std::io;
use std::net::ToSocketAddrs;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use kftp::client::FileClient;
use kftp::transport::{EndpointConfig, UdpEndpoint};

/// Interactive file-transfer client
#[derive(Parser, Debug)]
#[command(name = "client")]
#[command(version)]
#[command(about = "kftp interactive client")]
struct Args {
    /// Server address
    address: String,
    /// Server UDP port
    port: u16,
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the prompt protocol.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let server = (args.address.as_str(), args.port)
        .to_socket_addrs()
        .with_context(|| format!("resolving {}:{}", args.address, args.port))?
        .next()
        .context("server address resolved to nothing")?;

    let endpoint = UdpEndpoint::new(&EndpointConfig::default())?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    FileClient::new(endpoint, server).run(&mut stdin.lock(), &mut stdout.lock())?;
    Ok(())
}
