use axum::extract::{Query, State};
use axum::Json;
use brag_core::task::{CompletedTaskRecord, TaskStore};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct TaskQuery {
    pub since: Option<DateTime<Utc>>,
}

/// GET /api/tasks: completed tasks, optionally `?since=<RFC 3339>`.
pub async fn list_tasks(
    State(app): State<AppState>,
    Query(query): Query<TaskQuery>,
) -> Result<Json<Vec<CompletedTaskRecord>>, AppError> {
    let root = app.root.clone();
    let tasks = tokio::task::spawn_blocking(move || TaskStore::new(&root).completed_since(query.since))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(tasks))
}

/// POST /api/tasks: record a completed task. `id` is assigned by the store.
pub async fn add_task(
    State(app): State<AppState>,
    Json(mut task): Json<CompletedTaskRecord>,
) -> Result<Json<CompletedTaskRecord>, AppError> {
    task.accepted_statement = None;
    let _guard = app.write_lock.lock().await;
    let root = app.root.clone();
    let created = tokio::task::spawn_blocking(move || TaskStore::new(&root).add(task))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(created))
}
