// Server lifecycle: router construction and the accept loop.

use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;

use crate::infrastructure::http;
use crate::solver::EngineFactory;

pub struct ServerConfig {
    pub address: SocketAddr,
}

impl ServerConfig {
    pub fn new(address: SocketAddr) -> Self {
        Self { address }
    }
}

/// Builds the application router. Exposed separately so tests can serve it
/// on an ephemeral port.
pub fn router() -> Router {
    Router::new()
        .route("/solve", post(http::solve))
        .route("/solver-info", get(http::solver_info))
}

pub async fn start_server(config: ServerConfig) -> std::io::Result<()> {
    let listener = TcpListener::bind(config.address).await?;
    let info = EngineFactory::descriptor();
    tracing::info!(
        address = %config.address,
        solver = %info.solver,
        version = %info.version,
        "mipserve listening"
    );
    axum::serve(listener, router()).await
}
