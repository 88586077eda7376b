//! HTTP surface: batch and SSE generation endpoints.

mod error;
mod routes;
mod state;

pub use error::{AppError, AppResult};
pub use routes::{GenerateBody, GenerateResponse};
pub use state::AppState;

use std::future::Future;
use std::net::SocketAddr;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

/// Largest accepted request body.
pub const BODY_LIMIT: usize = 10 * 1024 * 1024;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/generate-quiz", post(routes::generate_quiz))
        .route("/generate-quiz-stream", post(routes::generate_quiz_stream))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<(), AppError>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(AppError::Server)
}

/// Bind `addr` and serve until Ctrl+C.
pub async fn start(addr: SocketAddr, state: AppState) -> Result<(), AppError> {
    let listener = TcpListener::bind(addr).await.map_err(AppError::Bind)?;
    info!(target: "slide_quiz::server", %addr, "listening");
    serve(listener, state, shutdown_signal()).await
}

/// Resolves when Ctrl+C is pressed
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!(target: "slide_quiz::server", error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!(target: "slide_quiz::server", "shutting down");
}
