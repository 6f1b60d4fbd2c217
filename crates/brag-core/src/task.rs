use crate::error::{BragError, Result};
use crate::paths;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// CompletedTaskRecord
// ---------------------------------------------------------------------------

/// A finished unit of work. Read-only to the generator; the only field the
/// review workflow ever writes back is `accepted_statement`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedTaskRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub steps: Vec<String>,
    /// Total elapsed or estimated minutes. Zero means "not tracked".
    #[serde(default)]
    pub minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_why: Option<String>,
    /// User-asserted outcome flags, e.g. `shipped_to_production: true`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outcome_confirmations: BTreeMap<String, bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_statement: Option<String>,
}

impl CompletedTaskRecord {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            title: title.into(),
            steps: Vec::new(),
            minutes: 0,
            core_why: None,
            outcome_confirmations: BTreeMap::new(),
            category: None,
            notes: None,
            completed_at: None,
            accepted_statement: None,
        }
    }

    pub fn step_count(&self) -> usize {
        self.steps.iter().filter(|s| !s.trim().is_empty()).count()
    }

    /// Recorded minutes, or the sum of per-step estimates when none were recorded.
    pub fn total_minutes(&self) -> u32 {
        if self.minutes > 0 {
            return self.minutes;
        }
        self.steps.iter().filter_map(|s| step_minutes(s)).sum()
    }

    pub fn has_time_tracked(&self) -> bool {
        self.total_minutes() > 0
    }

    pub fn has_notes(&self) -> bool {
        non_blank(self.core_why.as_deref()) || non_blank(self.notes.as_deref())
    }

    pub fn any_outcome_confirmed(&self) -> bool {
        self.outcome_confirmations.values().any(|v| *v)
    }

    /// Names of outcome flags set to true. The flag map itself never leaves
    /// the process for batch generation; only these names do.
    pub fn confirmed_outcomes(&self) -> Vec<&str> {
        self.outcome_confirmations
            .iter()
            .filter(|(_, v)| **v)
            .map(|(k, _)| k.as_str())
            .collect()
    }

    pub fn date_label(&self) -> String {
        self.completed_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "undated".to_string())
    }
}

fn non_blank(s: Option<&str>) -> bool {
    s.is_some_and(|s| !s.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Step minute suffixes
// ---------------------------------------------------------------------------

static STEP_MINUTES_RE: OnceLock<Regex> = OnceLock::new();

fn step_minutes_re() -> &'static Regex {
    STEP_MINUTES_RE.get_or_init(|| {
        Regex::new(
            r"(?i)\s*(?:[\(\[]\s*~?\s*(\d{1,4})\s*(?:m|min|mins|minutes)\s*[\)\]]|[-:]\s*~?\s*(\d{1,4})\s*(?:m|min|mins|minutes))\s*$",
        )
        .unwrap()
    })
}

/// Parse a trailing estimate like `(15m)`, `- 15 min`, or `[~20 mins]`.
pub fn step_minutes(step: &str) -> Option<u32> {
    let caps = step_minutes_re().captures(step)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .and_then(|m| m.as_str().parse().ok())
}

/// The step text with any trailing estimate removed.
pub fn step_label(step: &str) -> &str {
    match step_minutes_re().find(step) {
        Some(m) => step[..m.start()].trim_end(),
        None => step.trim_end(),
    }
}

// ---------------------------------------------------------------------------
// TaskStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskDocument {
    /// Monotonic so ids stay unique after removals.
    #[serde(default)]
    pub next_seq: u32,
    #[serde(default)]
    pub tasks: Vec<CompletedTaskRecord>,
}

/// The completed-task source backed by `.brag/tasks.yaml`.
#[derive(Debug, Clone)]
pub struct TaskStore {
    path: PathBuf,
}

impl TaskStore {
    pub fn new(root: &Path) -> Self {
        Self {
            path: paths::tasks_path(root),
        }
    }

    pub fn load(&self) -> Result<TaskDocument> {
        match crate::io::read_optional(&self.path)? {
            Some(data) if !data.trim().is_empty() => Ok(serde_yaml::from_str(&data)?),
            _ => Ok(TaskDocument::default()),
        }
    }

    fn save(&self, doc: &TaskDocument) -> Result<()> {
        let data = serde_yaml::to_string(doc)?;
        crate::io::atomic_write(&self.path, data.as_bytes())
    }

    pub fn list(&self) -> Result<Vec<CompletedTaskRecord>> {
        Ok(self.load()?.tasks)
    }

    /// Record a completed task, assigning `T<n>` and a completion time if absent.
    pub fn add(&self, mut task: CompletedTaskRecord) -> Result<CompletedTaskRecord> {
        if task.title.trim().is_empty() {
            return Err(BragError::InvalidInput("task title is required".into()));
        }
        let mut doc = self.load()?;
        doc.next_seq += 1;
        task.id = format!("T{}", doc.next_seq);
        if task.completed_at.is_none() {
            task.completed_at = Some(Utc::now());
        }
        doc.tasks.push(task.clone());
        self.save(&doc)?;
        Ok(task)
    }

    pub fn get(&self, id: &str) -> Result<CompletedTaskRecord> {
        self.load()?
            .tasks
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| BragError::TaskNotFound(id.to_string()))
    }

    /// Tasks completed at or after `since`; undated tasks are always included.
    pub fn completed_since(&self, since: Option<DateTime<Utc>>) -> Result<Vec<CompletedTaskRecord>> {
        let tasks = self.list()?;
        Ok(match since {
            None => tasks,
            Some(cutoff) => tasks
                .into_iter()
                .filter(|t| t.completed_at.map_or(true, |d| d >= cutoff))
                .collect(),
        })
    }

    /// Cache an accepted statement on the originating task.
    pub fn set_accepted_statement(&self, id: &str, statement: &str) -> Result<()> {
        let mut doc = self.load()?;
        let task = doc
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| BragError::TaskNotFound(id.to_string()))?;
        task.accepted_statement = Some(statement.to_string());
        self.save(&doc)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
