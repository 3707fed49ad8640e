//! HTTP surface.

mod routes;
mod state;

pub use routes::make_routes;
pub use state::ServerState;

use anyhow::Result;
use tracing::info;

/// Bind and serve until the process is stopped.
pub async fn run_server(state: ServerState, port: u16) -> Result<()> {
    let app = make_routes(state);
    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    info!("Listening on 127.0.0.1:{}", port);
    Ok(axum::serve(listener, app).await?)
}
