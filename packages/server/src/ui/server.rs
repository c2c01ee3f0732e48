//! Server execution logic.

use std::{future::Future, sync::Arc};

use axum::{
    Router,
    extract::Request,
    routing::{get, patch},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::{
    handler::{
        debug_rooms, health_check, list_messages, mark_seen, unread_count, websocket_handler,
    },
    signal::shutdown_signal,
    state::AppState,
};

/// Request span for the trace layer
///
/// Only the path is recorded. The query string may carry `?token=` on `/ws`.
fn request_span(request: &Request) -> Span {
    tracing::debug_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        version = ?request.version(),
    )
}

/// Real-time room relay server
///
/// # Example
///
/// ```ignore
/// let storage = StorageBackend::in_memory();
/// let state = AppState::new(&storage, Arc::new(SystemClock), JST_OFFSET_MINUTES);
/// Server::new(state).run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Build the router with every WebSocket and HTTP endpoint
    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/chat/{room_id}", get(list_messages))
            .route("/chat/seen/{room_id}", patch(mark_seen))
            .route("/chat/unread/{room_id}", get(unread_count))
            .route("/debug/rooms", get(debug_rooms))
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .with_state(self.state.clone())
    }

    /// Run the server until Ctrl+C / SIGTERM
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("Relay server listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
    }
}
