use crate::task::CompletedTaskRecord;
use crate::types::{Confidence, GenerationSource, Seniority, Wording};
use crate::vocabulary::normalize_tags;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// AchievementEntry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementEntry {
    pub title: String,
    /// Controlled actions and internal impact, one sentence.
    pub bullet: String,
    /// Effort only: time, counts, steps. Never outcome numbers.
    #[serde(default)]
    pub metrics: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_impact: Option<String>,
    /// Indices into the task list the batch was generated from.
    #[serde(default)]
    pub task_ids: Vec<usize>,
    #[serde(default)]
    pub count: usize,
    #[serde(default = "default_frequency")]
    pub frequency: String,
    pub confidence: Confidence,
    /// Set once the entry has been copied into the brag list.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub accepted: bool,
}

fn default_frequency() -> String {
    frequency_label(1).to_string()
}

pub fn frequency_label(count: usize) -> &'static str {
    match count {
        0 | 1 => "One-time",
        2..=4 => "Recurring",
        _ => "Ongoing",
    }
}

/// `125` → `2h 5m`, `45` → `45m`.
pub fn format_minutes(minutes: u32) -> String {
    let (h, m) = (minutes / 60, minutes % 60);
    match (h, m) {
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}

// ---------------------------------------------------------------------------
// EntryPatch
// ---------------------------------------------------------------------------

/// A partial update. Absent fields keep their current value; for
/// `overall_impact`, an explicit `null` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bullet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub overall_impact: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
}

/// Present-but-null deserializes to `Some(None)`; absence stays `None`
/// through `#[serde(default)]`.
fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl EntryPatch {
    pub fn is_empty(&self) -> bool {
        *self == EntryPatch::default()
    }

    /// Field-by-field override onto `entry`.
    pub fn apply(&self, entry: &mut AchievementEntry) {
        if let Some(v) = &self.title {
            entry.title = v.clone();
        }
        if let Some(v) = &self.bullet {
            entry.bullet = v.clone();
        }
        if let Some(v) = &self.metrics {
            entry.metrics = v.clone();
        }
        if let Some(v) = &self.category {
            entry.category = v.clone();
        }
        if let Some(v) = &self.tags {
            entry.tags = normalize_tags(v);
        }
        if let Some(v) = &self.overall_impact {
            entry.overall_impact = v.clone();
        }
        if let Some(v) = &self.frequency {
            entry.frequency = v.clone();
        }
        if let Some(v) = self.confidence {
            entry.confidence = v;
        }
    }
}

// ---------------------------------------------------------------------------
// GenerationBatch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    #[serde(default)]
    pub total_tasks: usize,
    #[serde(default)]
    pub total_minutes: u32,
    #[serde(default)]
    pub time_invested: String,
    #[serde(default)]
    pub top_category: String,
    #[serde(default)]
    pub overall_impact: String,
}

impl BatchSummary {
    /// Totals from the input tasks; top category is the most frequent entry
    /// category, ties resolved by first appearance.
    pub fn compute(
        tasks: &[CompletedTaskRecord],
        entries: &[AchievementEntry],
        overall_impact: impl Into<String>,
    ) -> Self {
        let total_minutes: u32 = tasks.iter().map(|t| t.total_minutes()).sum();
        let mut counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for (pos, e) in entries.iter().enumerate() {
            if e.category.is_empty() {
                continue;
            }
            counts.entry(e.category.as_str()).or_insert((0, pos)).0 += 1;
        }
        let top_category = counts
            .iter()
            .max_by(|a, b| a.1 .0.cmp(&b.1 .0).then(b.1 .1.cmp(&a.1 .1)))
            .map(|(c, _)| c.to_string())
            .unwrap_or_default();
        Self {
            total_tasks: tasks.len(),
            total_minutes,
            time_invested: format_minutes(total_minutes),
            top_category,
            overall_impact: overall_impact.into(),
        }
    }
}

/// One generation run. Replaced wholesale on regeneration; entries are
/// individually editable and removable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationBatch {
    pub entries: Vec<AchievementEntry>,
    pub summary: BatchSummary,
    pub source: GenerationSource,
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub seniority: Seniority,
    #[serde(default)]
    pub wording: Wording,
    /// Ids of the input tasks, positionally aligned with `task_ids` indices.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub task_refs: Vec<String>,
}

impl GenerationBatch {
    pub fn empty(seniority: Seniority, wording: Wording) -> Self {
        Self {
            entries: Vec::new(),
            summary: BatchSummary::default(),
            source: GenerationSource::Fallback,
            generated_at: Utc::now(),
            seniority,
            wording,
            task_refs: Vec::new(),
        }
    }

    /// Task ids an entry was built from, resolved through `task_refs`.
    pub fn source_task_ids(&self, entry: &AchievementEntry) -> Vec<String> {
        entry
            .task_ids
            .iter()
            .filter_map(|i| self.task_refs.get(*i))
            .filter(|id| !id.is_empty())
            .cloned()
            .collect()
    }
}

/// Generator output for the batch path. Warnings never block the batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub batch: GenerationBatch,
    pub violations: Vec<String>,
    pub unconfirmed_outcomes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Single-entry path
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SingleTaskInput {
    pub title: String,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub time_spent_minutes: Option<u32>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub outcome_confirmations: BTreeMap<String, bool>,
}

impl From<&CompletedTaskRecord> for SingleTaskInput {
    fn from(task: &CompletedTaskRecord) -> Self {
        let minutes = task.total_minutes();
        let notes = [task.core_why.as_deref(), task.notes.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            title: task.title.clone(),
            steps: task.steps.clone(),
            time_spent_minutes: (minutes > 0).then_some(minutes),
            category: task.category.clone(),
            notes: (!notes.is_empty()).then_some(notes),
            outcome_confirmations: task.outcome_confirmations.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SingleOutcome {
    pub entry: AchievementEntry,
    pub disallowed_claims: Vec<String>,
    pub source: GenerationSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, category: &str) -> AchievementEntry {
        AchievementEntry {
            title: title.to_string(),
            bullet: format!("Completed {title}."),
            metrics: "30m invested across 1 task(s)".to_string(),
            category: category.to_string(),
            tags: vec!["DELIVERY".to_string()],
            overall_impact: Some("Kept things moving.".to_string()),
            task_ids: vec![0],
            count: 1,
            frequency: "One-time".to_string(),
            confidence: Confidence::Low,
            accepted: false,
        }
    }

    #[test]
    fn patch_overrides_present_fields_only() {
        let mut e = entry("Report", "Delivery");
        let patch: EntryPatch = serde_json::from_str(r#"{"bullet": "Prepared the report."}"#).unwrap();
        patch.apply(&mut e);
        assert_eq!(e.bullet, "Prepared the report.");
        assert_eq!(e.title, "Report");
        assert_eq!(e.overall_impact.as_deref(), Some("Kept things moving."));
    }

    #[test]
    fn patch_null_clears_overall_impact() {
        let mut e = entry("Report", "Delivery");
        let patch: EntryPatch = serde_json::from_str(r#"{"overall_impact": null}"#).unwrap();
        assert_eq!(patch.overall_impact, Some(None));
        patch.apply(&mut e);
        assert!(e.overall_impact.is_none());
    }

    #[test]
    fn patch_absent_overall_impact_is_untouched() {
        let patch: EntryPatch = serde_json::from_str("{}").unwrap();
        assert!(patch.is_empty());
        assert_eq!(patch.overall_impact, None);
    }

    #[test]
    fn patch_tags_are_normalized() {
        let mut e = entry("Report", "Delivery");
        EntryPatch {
            tags: Some(vec!["clarity".into(), "bogus".into()]),
            ..Default::default()
        }
        .apply(&mut e);
        assert_eq!(e.tags, vec!["CLARITY"]);
    }

    #[test]
    fn summary_top_category_ties_go_to_first() {
        let entries = vec![
            entry("a", "Planning"),
            entry("b", "Delivery"),
            entry("c", "Delivery"),
            entry("d", "Planning"),
        ];
        let mut t = CompletedTaskRecord::new("x");
        t.minutes = 90;
        let s = BatchSummary::compute(&[t.clone(), t], &entries, "Steady delivery.");
        assert_eq!(s.top_category, "Planning");
        assert_eq!(s.total_tasks, 2);
        assert_eq!(s.total_minutes, 180);
        assert_eq!(s.time_invested, "3h");
    }

    #[test]
    fn format_minutes_variants() {
        assert_eq!(format_minutes(0), "0m");
        assert_eq!(format_minutes(45), "45m");
        assert_eq!(format_minutes(125), "2h 5m");
    }

    #[test]
    fn frequency_labels() {
        assert_eq!(frequency_label(1), "One-time");
        assert_eq!(frequency_label(3), "Recurring");
        assert_eq!(frequency_label(8), "Ongoing");
    }

    #[test]
    fn accepted_flag_omitted_when_false() {
        let yaml = serde_yaml::to_string(&entry("Report", "Delivery")).unwrap();
        assert!(!yaml.contains("accepted"));
    }

    #[test]
    fn single_input_from_task_merges_notes() {
        let mut t = CompletedTaskRecord::new("Runbook");
        t.core_why = Some("On-call kept paging".into());
        t.notes = Some("Shared in #ops".into());
        t.steps = vec!["Draft (20m)".into()];
        let input = SingleTaskInput::from(&t);
        assert_eq!(input.time_spent_minutes, Some(20));
        assert_eq!(input.notes.as_deref(), Some("On-call kept paging Shared in #ops"));
    }
}
