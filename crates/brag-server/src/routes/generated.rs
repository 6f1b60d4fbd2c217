use axum::extract::{Path, State};
use axum::Json;
use brag_core::entry::{AchievementEntry, EntryPatch};
use brag_core::store::EntryStore;
use brag_core::workflow::{accept_persisted, AcceptOutcome};
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

/// PATCH /api/generated/{index}: overwrite the given fields of one entry.
pub async fn update_entry(
    State(app): State<AppState>,
    Path(index): Path<usize>,
    Json(patch): Json<EntryPatch>,
) -> Result<Json<AchievementEntry>, AppError> {
    let _guard = app.write_lock.lock().await;
    let root = app.root.clone();
    let updated = tokio::task::spawn_blocking(move || {
        EntryStore::new(&root).update_generated_entry(index, &patch)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(updated))
}

/// DELETE /api/generated/{index}: drop one entry from the batch.
pub async fn delete_entry(
    State(app): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<AchievementEntry>, AppError> {
    let _guard = app.write_lock.lock().await;
    let root = app.root.clone();
    let removed = tokio::task::spawn_blocking(move || {
        EntryStore::new(&root).delete_generated_entry(index)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(removed))
}

#[derive(Debug, Deserialize)]
pub struct AcceptBody {
    pub index: usize,
}

/// POST /api/accept: append a generated entry to the brag list.
pub async fn accept_entry(
    State(app): State<AppState>,
    Json(body): Json<AcceptBody>,
) -> Result<Json<AcceptOutcome>, AppError> {
    let _guard = app.write_lock.lock().await;
    let root = app.root.clone();
    let outcome = tokio::task::spawn_blocking(move || accept_persisted(&root, body.index))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(outcome))
}
