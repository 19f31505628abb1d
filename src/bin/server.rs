//! File server binary: `server <port>`

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use kftp::server::FileServer;
use kftp::transport::{EndpointConfig, UdpEndpoint};

/// Serve files from the current directory over reliable UDP
#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(version)]
#[command(about = "kftp file server")]
struct Args {
    /// UDP port to listen on
    port: u16,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = EndpointConfig {
        bind_addr: format!("0.0.0.0:{}", args.port),
        ..EndpointConfig::default()
    };
    let endpoint =
        UdpEndpoint::new(&config).with_context(|| format!("binding UDP port {}", args.port))?;
    info!(port = args.port, "listening");

    FileServer::new(endpoint).run()?;
    Ok(())
}
