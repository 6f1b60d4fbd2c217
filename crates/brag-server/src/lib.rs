pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{delete, get, patch, post};
use axum::Router;
use brag_core::generator::StatementGenerator;
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve_on()` and available for integration testing.
pub fn build_router(root: PathBuf, generator: StatementGenerator) -> Router {
    let app_state = state::AppState::new(root, generator);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Generation
        .route("/api/generate", post(routes::generate::generate_batch))
        .route("/api/generate/single", post(routes::generate::generate_single))
        // Generated batch review
        .route(
            "/api/generated/{index}",
            patch(routes::generated::update_entry).delete(routes::generated::delete_entry),
        )
        .route("/api/accept", post(routes::generated::accept_entry))
        // Accepted brag list
        .route("/api/ledger", get(routes::ledger::list_entries))
        .route("/api/ledger/{index}", delete(routes::ledger::delete_at))
        .route("/api/ledger/id/{id}", delete(routes::ledger::delete_by_id))
        // Combined read
        .route("/api/brag", get(routes::brag::read_all))
        // Task source
        .route(
            "/api/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::add_task),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Serve on an already-bound listener, so the caller can read the actual
/// port first (useful with port 0).
pub async fn serve_on(
    root: PathBuf,
    generator: StatementGenerator,
    listener: tokio::net::TcpListener,
) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    tracing::info!(
        backend = generator.backend_name(),
        "brag API listening on http://localhost:{actual_port}"
    );
    let app = build_router(root, generator);
    axum::serve(listener, app).await?;
    Ok(())
}
