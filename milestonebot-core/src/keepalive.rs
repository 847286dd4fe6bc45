use std::net::SocketAddr;

use axum::{Router, routing::get};
use axum_server::{Handle, Server};
use tokio::sync::oneshot;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::Error;

pub const ALIVE_BODY: &str = "Bot is alive!";

/// Router answering `GET /` so uptime pingers see the process is up.
pub fn keepalive_router() -> Router {
    Router::new()
        .route("/", get(|| async { ALIVE_BODY }))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

/// Serves the keep-alive route on `addr` in the background.
///
/// Send on (or drop) the returned sender to shut the server down gracefully.
pub async fn start_keepalive_server(addr: SocketAddr) -> Result<oneshot::Sender<()>, Error> {
    let (shutdown_send, shutdown_recv) = oneshot::channel::<()>();
    info!("Keep-alive server listening on http://{}", addr);

    let handle = Handle::new();
    let handle_clone = handle.clone();

    tokio::spawn(async move {
        let _ = shutdown_recv.await;
        handle_clone.graceful_shutdown(None);
    });

    let server = Server::bind(addr)
        .handle(handle)
        .serve(keepalive_router().into_make_service());

    tokio::spawn(async move {
        if let Err(e) = server.await {
            error!("Keep-alive server error: {}", e);
        }
        info!("Keep-alive server shut down.");
    });

    Ok(shutdown_send)
}
