//! Review and accept workflow over one generation cycle.
//!
//! ```text
//! NoBatch -> Generating -> BatchReady -> (EditingEntry | Accepting | Deleting) -> BatchReady
//! ```
//!
//! Generation always lands in `BatchReady`: model failures become fallback
//! batches inside the generator. Store failures are returned to the caller
//! unchanged and never retried here.

use crate::entry::{AchievementEntry, BatchOutcome, EntryPatch, GenerationBatch};
use crate::error::{BragError, Result};
use crate::generator::StatementGenerator;
use crate::store::EntryStore;
use crate::task::TaskStore;
use crate::types::{Seniority, Wording};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ReviewPhase {
    NoBatch,
    Generating,
    BatchReady,
    EditingEntry { index: usize },
    Accepting { index: usize },
    Deleting { index: usize },
}

impl fmt::Display for ReviewPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewPhase::NoBatch => f.write_str("no_batch"),
            ReviewPhase::Generating => f.write_str("generating"),
            ReviewPhase::BatchReady => f.write_str("batch_ready"),
            ReviewPhase::EditingEntry { index } => write!(f, "editing_entry({index})"),
            ReviewPhase::Accepting { index } => write!(f, "accepting({index})"),
            ReviewPhase::Deleting { index } => write!(f, "deleting({index})"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    pub seniority: Seniority,
    pub wording: Wording,
    /// Only tasks completed at or after this instant.
    pub since: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Accept
// ---------------------------------------------------------------------------

/// What an accept actually did. The ledger write, the batch flag, and the
/// task write-back are separate documents, so each is reported on its own.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AcceptOutcome {
    pub index: usize,
    pub title: String,
    pub already_accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_id: Option<String>,
    pub batch_marked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tasks_updated: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub task_errors: Vec<String>,
}

impl AcceptOutcome {
    /// True when every half of the accept landed.
    pub fn is_complete(&self) -> bool {
        self.already_accepted
            || (self.ledger_id.is_some() && self.batch_marked && self.task_errors.is_empty())
    }
}

/// Accept entry `index` of `batch` (the caller's current view).
///
/// Already-accepted entries are a no-op success. A ledger failure is an
/// error; a failure to flag the batch or cache the statement on the source
/// tasks after the ledger write is reported in the outcome instead.
pub fn accept_entry(
    store: &EntryStore,
    tasks: &TaskStore,
    batch: &GenerationBatch,
    index: usize,
) -> Result<AcceptOutcome> {
    let len = batch.entries.len();
    let entry = batch
        .entries
        .get(index)
        .ok_or(BragError::EntryNotFound { index, len })?;
    let mut outcome = AcceptOutcome {
        index,
        title: entry.title.clone(),
        ..Default::default()
    };
    if entry.accepted {
        outcome.already_accepted = true;
        return Ok(outcome);
    }

    outcome.ledger_id = Some(store.append_ledger_entry(entry)?);

    match store.mark_accepted(index) {
        Ok(_) => outcome.batch_marked = true,
        Err(e) => {
            warn!(index, error = %e, "accepted into brag list but could not flag the batch entry");
            outcome.batch_error = Some(e.to_string());
        }
    }

    for task_id in batch.source_task_ids(entry) {
        match tasks.set_accepted_statement(&task_id, &entry.bullet) {
            Ok(()) => outcome.tasks_updated.push(task_id),
            Err(e) => {
                warn!(task = %task_id, error = %e, "could not cache accepted statement on task");
                outcome.task_errors.push(format!("{task_id}: {e}"));
            }
        }
    }

    info!(index, complete = outcome.is_complete(), "accepted entry");
    Ok(outcome)
}

/// Accept against the persisted batch.
pub fn accept_persisted(root: &Path, index: usize) -> Result<AcceptOutcome> {
    let store = EntryStore::new(root);
    let batch = store.load_batch()?.ok_or(BragError::NoBatch)?;
    accept_entry(&store, &TaskStore::new(root), &batch, index)
}

// ---------------------------------------------------------------------------
// Edit draft
// ---------------------------------------------------------------------------

/// In-place editable copy of the user-facing text of one entry.
#[derive(Debug, Clone, PartialEq)]
pub struct EditDraft {
    pub index: usize,
    pub title: String,
    pub bullet: String,
    pub metrics: String,
}

impl EditDraft {
    fn from_entry(index: usize, e: &AchievementEntry) -> Self {
        Self {
            index,
            title: e.title.clone(),
            bullet: e.bullet.clone(),
            metrics: e.metrics.clone(),
        }
    }

    pub fn to_patch(&self) -> EntryPatch {
        EntryPatch {
            title: Some(self.title.clone()),
            bullet: Some(self.bullet.clone()),
            metrics: Some(self.metrics.clone()),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// ReviewSession
// ---------------------------------------------------------------------------

pub struct ReviewSession {
    generator: StatementGenerator,
    store: EntryStore,
    tasks: TaskStore,
    phase: ReviewPhase,
    batch: Option<GenerationBatch>,
    draft: Option<EditDraft>,
}

impl ReviewSession {
    /// Resume from whatever batch is on disk. An unparseable batch opens as
    /// `NoBatch` so the next generate overwrites it.
    pub fn open(root: &Path, generator: StatementGenerator) -> Result<Self> {
        let store = EntryStore::new(root);
        let (batch, _) = store.load_batch_lenient()?;
        let phase = if batch.is_some() {
            ReviewPhase::BatchReady
        } else {
            ReviewPhase::NoBatch
        };
        Ok(Self {
            generator,
            store,
            tasks: TaskStore::new(root),
            phase,
            batch,
            draft: None,
        })
    }

    pub fn phase(&self) -> ReviewPhase {
        self.phase
    }

    pub fn batch(&self) -> Option<&GenerationBatch> {
        self.batch.as_ref()
    }

    pub fn draft(&self) -> Option<&EditDraft> {
        self.draft.as_ref()
    }

    pub fn draft_mut(&mut self) -> Option<&mut EditDraft> {
        self.draft.as_mut()
    }

    fn require_ready(&self) -> Result<&GenerationBatch> {
        match (self.phase, self.batch.as_ref()) {
            (ReviewPhase::BatchReady, Some(batch)) => Ok(batch),
            (ReviewPhase::NoBatch, _) | (_, None) => Err(BragError::NoBatch),
            (phase, _) => Err(BragError::InvalidInput(format!(
                "cannot do that while {phase}; save or cancel first"
            ))),
        }
    }

    fn check_index(&self, index: usize) -> Result<()> {
        let batch = self.require_ready()?;
        let len = batch.entries.len();
        if index >= len {
            return Err(BragError::EntryNotFound { index, len });
        }
        Ok(())
    }

    /// Generate and persist a new batch, replacing the old one along with
    /// any edit in progress and accepted markers.
    pub fn generate(&mut self, request: &GenerateRequest) -> Result<BatchOutcome> {
        let previous = self.phase;
        self.phase = ReviewPhase::Generating;
        self.draft = None;

        let tasks = match self.tasks.completed_since(request.since) {
            Ok(t) => t,
            Err(e) => {
                self.phase = previous;
                return Err(e);
            }
        };
        let outcome = self
            .generator
            .generate_batch(&tasks, request.seniority, request.wording);
        if let Err(e) = self.store.save_generation_batch(&outcome.batch) {
            self.phase = if self.batch.is_some() {
                ReviewPhase::BatchReady
            } else {
                ReviewPhase::NoBatch
            };
            return Err(e);
        }
        self.batch = Some(outcome.batch.clone());
        self.phase = ReviewPhase::BatchReady;
        Ok(outcome)
    }

    /// Reload the batch from disk, e.g. after a `NotFound`.
    pub fn refresh(&mut self) -> Result<()> {
        self.batch = self.store.load_batch_lenient()?.0;
        self.draft = None;
        self.phase = if self.batch.is_some() {
            ReviewPhase::BatchReady
        } else {
            ReviewPhase::NoBatch
        };
        Ok(())
    }

    pub fn accept(&mut self, index: usize) -> Result<AcceptOutcome> {
        self.check_index(index)?;
        self.phase = ReviewPhase::Accepting { index };
        let result = match self.batch.as_ref() {
            Some(batch) => accept_entry(&self.store, &self.tasks, batch, index),
            None => Err(BragError::NoBatch),
        };
        self.phase = ReviewPhase::BatchReady;
        let outcome = result?;
        // The ledger has it now, so never append it twice in this session
        // even if flagging the batch on disk failed.
        if let Some(e) = self.batch.as_mut().and_then(|b| b.entries.get_mut(index)) {
            e.accepted = true;
        }
        Ok(outcome)
    }

    pub fn begin_edit(&mut self, index: usize) -> Result<&mut EditDraft> {
        self.check_index(index)?;
        let entry = self
            .batch
            .as_ref()
            .and_then(|b| b.entries.get(index))
            .ok_or(BragError::NoBatch)?;
        self.draft = Some(EditDraft::from_entry(index, entry));
        self.phase = ReviewPhase::EditingEntry { index };
        self.draft.as_mut().ok_or(BragError::NoBatch)
    }

    /// Persist the draft. On failure the draft is kept so the caller can
    /// retry after fixing the cause or cancel.
    pub fn save_edit(&mut self) -> Result<AchievementEntry> {
        let ReviewPhase::EditingEntry { index } = self.phase else {
            return Err(BragError::InvalidInput("no edit in progress".into()));
        };
        let patch = self
            .draft
            .as_ref()
            .map(EditDraft::to_patch)
            .ok_or_else(|| BragError::InvalidInput("no edit in progress".into()))?;
        let updated = self.store.update_generated_entry(index, &patch)?;
        if let Some(e) = self.batch.as_mut().and_then(|b| b.entries.get_mut(index)) {
            *e = updated.clone();
        }
        self.draft = None;
        self.phase = ReviewPhase::BatchReady;
        Ok(updated)
    }

    pub fn cancel_edit(&mut self) {
        if matches!(self.phase, ReviewPhase::EditingEntry { .. }) {
            self.phase = ReviewPhase::BatchReady;
        }
        self.draft = None;
    }

    pub fn delete(&mut self, index: usize) -> Result<AchievementEntry> {
        self.check_index(index)?;
        self.phase = ReviewPhase::Deleting { index };
        let result = self.store.delete_generated_entry(index);
        self.phase = ReviewPhase::BatchReady;
        let removed = result?;
        if let Some(b) = self.batch.as_mut() {
            if index < b.entries.len() {
                b.entries.remove(index);
            }
        }
        Ok(removed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
