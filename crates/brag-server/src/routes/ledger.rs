use axum::extract::{Path, State};
use axum::Json;
use brag_core::ledger::LedgerBlock;
use brag_core::store::EntryStore;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/ledger: accepted entries with positions and ids.
pub async fn list_entries(State(app): State<AppState>) -> Result<Json<Vec<LedgerBlock>>, AppError> {
    let root = app.root.clone();
    let blocks = tokio::task::spawn_blocking(move || EntryStore::new(&root).ledger_entries())
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(blocks))
}

/// DELETE /api/ledger/{index}: remove the block at a position.
pub async fn delete_at(
    State(app): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<LedgerBlock>, AppError> {
    let _guard = app.write_lock.lock().await;
    let root = app.root.clone();
    let removed = tokio::task::spawn_blocking(move || {
        EntryStore::new(&root).delete_ledger_entry_at(index)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(removed))
}

/// DELETE /api/ledger/id/{id}: remove the block carrying this id.
pub async fn delete_by_id(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LedgerBlock>, AppError> {
    let _guard = app.write_lock.lock().await;
    let root = app.root.clone();
    let removed = tokio::task::spawn_blocking(move || EntryStore::new(&root).delete_ledger_entry(&id))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(removed))
}
