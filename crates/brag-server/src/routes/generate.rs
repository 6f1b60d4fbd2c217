use axum::extract::State;
use axum::Json;
use brag_core::config::BragConfig;
use brag_core::entry::{BatchOutcome, SingleOutcome, SingleTaskInput};
use brag_core::store::EntryStore;
use brag_core::task::TaskStore;
use brag_core::types::{Seniority, Wording};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GenerateBody {
    /// Defaults to `profile.seniority` from config.
    pub seniority: Option<Seniority>,
    /// Defaults to `profile.wording` from config.
    pub wording: Option<Wording>,
    pub since: Option<DateTime<Utc>>,
}

/// POST /api/generate: generate and persist a new batch from completed tasks.
///
/// The model call runs without the write lock; only the final save
/// serializes with other writers, and it replaces the batch wholesale.
pub async fn generate_batch(
    State(app): State<AppState>,
    Json(body): Json<GenerateBody>,
) -> Result<Json<BatchOutcome>, AppError> {
    let root = app.root.clone();
    let generator = app.generator.clone();
    let outcome = tokio::task::spawn_blocking(move || -> brag_core::Result<BatchOutcome> {
        let config = BragConfig::load(&root)?;
        let tasks = TaskStore::new(&root).completed_since(body.since)?;
        Ok(generator.generate_batch(
            &tasks,
            body.seniority.unwrap_or(config.profile.seniority),
            body.wording.unwrap_or(config.profile.wording),
        ))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    let _guard = app.write_lock.lock().await;
    let root = app.root.clone();
    let outcome = tokio::task::spawn_blocking(move || -> brag_core::Result<BatchOutcome> {
        EntryStore::new(&root).save_generation_batch(&outcome.batch)?;
        Ok(outcome)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(outcome))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SingleBody {
    /// Generate from a recorded task...
    pub task_id: Option<String>,
    /// ...or from inline task details.
    pub task: Option<SingleTaskInput>,
    pub seniority: Option<Seniority>,
    pub wording: Option<Wording>,
}

/// POST /api/generate/single: one statement for one task. Nothing is persisted.
pub async fn generate_single(
    State(app): State<AppState>,
    Json(body): Json<SingleBody>,
) -> Result<Json<SingleOutcome>, AppError> {
    if body.task_id.is_some() == body.task.is_some() {
        return Err(AppError::bad_request(
            "pass exactly one of task_id or task",
        ));
    }
    let root = app.root.clone();
    let generator = app.generator.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let config = BragConfig::load(&root)?;
        let input = match (body.task_id, body.task) {
            (Some(id), _) => SingleTaskInput::from(&TaskStore::new(&root).get(&id)?),
            (None, Some(task)) => task,
            (None, None) => SingleTaskInput::default(),
        };
        generator.generate_single(
            &input,
            body.seniority.unwrap_or(config.profile.seniority),
            body.wording.unwrap_or(config.profile.wording),
        )
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(outcome))
}
