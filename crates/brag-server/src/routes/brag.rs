use axum::extract::State;
use axum::Json;
use brag_core::store::{BragView, EntryStore};

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/brag: ledger Markdown, its block summaries, and the current batch.
pub async fn read_all(State(app): State<AppState>) -> Result<Json<BragView>, AppError> {
    let root = app.root.clone();
    let view = tokio::task::spawn_blocking(move || EntryStore::new(&root).read_all())
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(view))
}
