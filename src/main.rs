use std::net::SocketAddr;

use anyhow::Result;
use clap::Parser;
use mipserve::{start_server, ServerConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Streaming HTTP API for MIP solvers", long_about = None)]
struct Opt {
    /// Address to bind the HTTP server
    #[arg(long, env = "MIPSERVE_ADDR", default_value = "127.0.0.1:8000")]
    addr: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let opt = Opt::parse();
    start_server(ServerConfig::new(opt.addr)).await?;
    Ok(())
}
