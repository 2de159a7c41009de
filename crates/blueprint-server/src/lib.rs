pub mod error;
pub mod routes;
pub mod sse;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve_on()` and available for integration testing.
pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Live connections (SSE)
        .route("/api/events", get(routes::events::sse_events))
        .route(
            "/api/subscriptions/{connection}",
            post(routes::subscriptions::subscribe).delete(routes::subscriptions::unsubscribe),
        )
        // Replication edge
        .route("/api/notify", post(routes::notify::notify_commit))
        .route("/api/broadcast", post(routes::broadcast::broadcast))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Serve the hub on a pre-bound listener.
///
/// Accepting a bound `TcpListener` lets the caller read the actual port
/// first (useful when `port = 0` and the OS picks a free port).
pub async fn serve_on(app_state: AppState, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = build_router(app_state);

    tracing::info!("blueprint hub listening on http://localhost:{actual_port}");

    axum::serve(listener, app).await?;
    Ok(())
}
