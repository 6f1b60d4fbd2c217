//! Statement generation: prompt building, model invocation, and tolerant
//! parsing into validated entries.
//!
//! Anything that goes wrong on the model side (unreachable, timeout,
//! unparseable output) ends in template synthesis. Vocabulary problems in
//! model output are reported as warnings next to the entries, never used to
//! reject or rewrite them.

use crate::config::{BragConfig, GenerationConfig};
use crate::entry::{
    frequency_label, AchievementEntry, BatchOutcome, BatchSummary, GenerationBatch,
    SingleOutcome, SingleTaskInput,
};
use crate::error::{BragError, Result};
use crate::fallback::{synthesize_batch, synthesize_single};
use crate::prompts::{fill, PromptBook};
use crate::repair::parse_with_recovery;
use crate::task::CompletedTaskRecord;
use crate::textgen::{generator_from_config, DisabledGenerator, GenerationOptions, TextGenerator};
use crate::types::{Confidence, GenerationSource, Seniority, Wording};
use crate::vocabulary::{
    calculate_confidence, humanize_outcome, normalize_tags, ImpactTheme, SeniorityProfile,
    VocabularyPolicy, WordingProfile, DELIVERY_TAG, TAG_VOCABULARY,
};
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// How many banned words are quoted back to the model. The full list is
/// still enforced after generation.
const PROMPT_BANNED_SLICE: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub max_tokens: u32,
    pub single_max_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self::from(&GenerationConfig::default())
    }
}

impl From<&GenerationConfig> for GenerationSettings {
    fn from(cfg: &GenerationConfig) -> Self {
        Self {
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
            single_max_tokens: cfg.single_max_tokens,
        }
    }
}

#[derive(Clone)]
pub struct StatementGenerator {
    textgen: Arc<dyn TextGenerator>,
    prompts: Arc<PromptBook>,
    policy: Arc<VocabularyPolicy>,
    settings: GenerationSettings,
}

impl StatementGenerator {
    pub fn new(textgen: Arc<dyn TextGenerator>, prompts: Arc<PromptBook>) -> Self {
        Self {
            textgen,
            prompts,
            policy: Arc::new(VocabularyPolicy::builtin().clone()),
            settings: GenerationSettings::default(),
        }
    }

    pub fn from_config(
        config: &BragConfig,
        textgen: Arc<dyn TextGenerator>,
        prompts: Arc<PromptBook>,
    ) -> Self {
        Self::new(textgen, prompts).with_settings(GenerationSettings::from(&config.generation))
    }

    /// Generator for a project: config settings, prompt overrides from
    /// `.brag/prompts.yaml`, and the configured backend unless `offline`.
    pub fn for_project(root: &Path, config: &BragConfig, offline: bool) -> Result<Self> {
        let prompts = Arc::new(PromptBook::load(root)?);
        let textgen: Arc<dyn TextGenerator> = if offline {
            Arc::new(DisabledGenerator)
        } else {
            generator_from_config(&config.generation)
        };
        Ok(Self::from_config(config, textgen, prompts))
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_policy(mut self, policy: Arc<VocabularyPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &VocabularyPolicy {
        &self.policy
    }

    pub fn backend_name(&self) -> &str {
        self.textgen.name()
    }

    // -----------------------------------------------------------------------
    // Batch path
    // -----------------------------------------------------------------------

    pub fn generate_batch(
        &self,
        tasks: &[CompletedTaskRecord],
        seniority: Seniority,
        wording: Wording,
    ) -> BatchOutcome {
        if tasks.is_empty() {
            info!("no completed tasks; returning empty batch");
            return BatchOutcome {
                batch: GenerationBatch::empty(seniority, wording),
                violations: Vec::new(),
                unconfirmed_outcomes: Vec::new(),
                fallback_reason: None,
            };
        }

        let prompt = self.batch_prompt(tasks, seniority, wording);
        let options = GenerationOptions {
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            system_prompt: Some(self.prompts.batch_system.clone()),
        };

        let reason = match self.textgen.generate(&prompt, &options) {
            Ok(text) => match self.parse_batch(&text, tasks, seniority, wording) {
                Some(outcome) => {
                    info!(
                        source = "model",
                        entries = outcome.batch.entries.len(),
                        violations = outcome.violations.len(),
                        "generated batch"
                    );
                    if !outcome.violations.is_empty() {
                        warn!(violations = ?outcome.violations, "banned vocabulary in model output");
                    }
                    if !outcome.unconfirmed_outcomes.is_empty() {
                        warn!(outcomes = ?outcome.unconfirmed_outcomes, "unconfirmed outcome claims in model output");
                    }
                    return outcome;
                }
                None => "model output could not be parsed into entries and a summary".to_string(),
            },
            Err(e) => e.to_string(),
        };

        warn!(reason = %reason, "falling back to template synthesis");
        let batch = synthesize_batch(tasks, seniority, wording, &self.policy);
        info!(source = "fallback", entries = batch.entries.len(), "generated batch");
        BatchOutcome {
            batch,
            violations: Vec::new(),
            unconfirmed_outcomes: Vec::new(),
            fallback_reason: Some(reason),
        }
    }

    pub fn batch_prompt(
        &self,
        tasks: &[CompletedTaskRecord],
        seniority: Seniority,
        wording: Wording,
    ) -> String {
        let profile = SeniorityProfile::for_mode(seniority);
        let tone = WordingProfile::for_mode(wording);
        let task_lines = tasks
            .iter()
            .enumerate()
            .map(|(i, t)| task_line(i, t))
            .collect::<Vec<_>>()
            .join("\n");
        let banned = self
            .policy
            .banned_words()
            .iter()
            .take(PROMPT_BANNED_SLICE)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        let emphasis = profile.emphasis.join(", ");
        let common = self.common_vars(seniority, wording);
        let mut vars: Vec<(&str, &str)> = common.iter().map(|(k, v)| (*k, v.as_str())).collect();
        vars.extend([
            ("emphasis", emphasis.as_str()),
            ("quantifier_style", tone.quantifier_style),
            ("banned_words", banned.as_str()),
            ("tasks", task_lines.as_str()),
        ]);
        fill(&self.prompts.batch_template, &vars)
    }

    fn common_vars(&self, seniority: Seniority, wording: Wording) -> Vec<(&'static str, String)> {
        let profile = SeniorityProfile::for_mode(seniority);
        let tone = WordingProfile::for_mode(wording);
        vec![
            ("seniority", seniority.label().to_string()),
            ("max_scope", profile.max_scope.to_string()),
            ("assertiveness", tone.assertiveness.to_string()),
            ("allowed_verbs", profile.allowed_verbs.join(", ")),
            ("themes", theme_lines()),
            ("tags", TAG_VOCABULARY.join(", ")),
        ]
    }

    fn parse_batch(
        &self,
        text: &str,
        tasks: &[CompletedTaskRecord],
        seniority: Seniority,
        wording: Wording,
    ) -> Option<BatchOutcome> {
        let json = parse_with_recovery(text)?;
        let raw_entries = json.get("entries")?.as_array()?;
        let raw_summary = json.get("summary")?;
        if !raw_summary.is_object() {
            return None;
        }

        let entries: Vec<AchievementEntry> = raw_entries
            .iter()
            .filter_map(|v| parse_entry(v, tasks))
            .collect();
        if entries.is_empty() {
            return None;
        }

        let mut violations: Vec<String> = Vec::new();
        let mut unconfirmed: Vec<String> = Vec::new();
        for e in &entries {
            for hit in self.policy.detect_banned_vocabulary(&entry_text(e)) {
                if !violations.contains(&hit) {
                    violations.push(hit);
                }
            }
            for claim in unconfirmed_claims(e, tasks) {
                if !unconfirmed.contains(&claim) {
                    unconfirmed.push(claim);
                }
            }
        }

        let overall = str_field(raw_summary, "overall_impact").unwrap_or_default();
        let mut summary = BatchSummary::compute(tasks, &entries, overall);
        if let Some(top) = str_field(raw_summary, "top_category") {
            summary.top_category = top;
        }

        Some(BatchOutcome {
            batch: GenerationBatch {
                entries,
                summary,
                source: GenerationSource::Model,
                generated_at: Utc::now(),
                seniority,
                wording,
                task_refs: tasks.iter().map(|t| t.id.clone()).collect(),
            },
            violations,
            unconfirmed_outcomes: unconfirmed,
            fallback_reason: None,
        })
    }

    // -----------------------------------------------------------------------
    // Single-entry path
    // -----------------------------------------------------------------------

    pub fn generate_single(
        &self,
        input: &SingleTaskInput,
        seniority: Seniority,
        wording: Wording,
    ) -> Result<SingleOutcome> {
        if input.title.trim().is_empty() {
            return Err(BragError::InvalidInput("task title is required".into()));
        }

        let prompt = self.single_prompt(input, seniority, wording);
        let options = GenerationOptions {
            temperature: self.settings.temperature,
            max_tokens: self.settings.single_max_tokens,
            system_prompt: Some(self.prompts.single_system.clone()),
        };

        let reason = match self.textgen.generate(&prompt, &options) {
            Ok(text) => match self.parse_single(&text, input) {
                Some(outcome) => {
                    info!(source = "model", "generated single entry");
                    if !outcome.disallowed_claims.is_empty() {
                        warn!(claims = ?outcome.disallowed_claims, "disallowed claims in model output");
                    }
                    return Ok(outcome);
                }
                None => "model output could not be parsed into an entry".to_string(),
            },
            Err(e) => e.to_string(),
        };

        warn!(reason = %reason, "falling back to single-entry template");
        Ok(SingleOutcome {
            entry: synthesize_single(input, seniority, &self.policy),
            disallowed_claims: Vec::new(),
            source: GenerationSource::Fallback,
            fallback_reason: Some(reason),
        })
    }

    pub fn single_prompt(&self, input: &SingleTaskInput, seniority: Seniority, wording: Wording) -> String {
        let tone = WordingProfile::for_mode(wording);
        let steps = if input.steps.is_empty() {
            "- (none recorded)".to_string()
        } else {
            input
                .steps
                .iter()
                .map(|s| format!("- {s}"))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let outcomes = if input.outcome_confirmations.is_empty() {
            "- (none)".to_string()
        } else {
            input
                .outcome_confirmations
                .iter()
                .map(|(k, v)| format!("- {k}: {v}"))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let time_spent = input
            .time_spent_minutes
            .map(crate::entry::format_minutes)
            .unwrap_or_else(|| "not tracked".to_string());
        let banned = self
            .policy
            .banned_words()
            .iter()
            .take(PROMPT_BANNED_SLICE)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        let common = self.common_vars(seniority, wording);
        let mut vars: Vec<(&str, &str)> = common.iter().map(|(k, v)| (*k, v.as_str())).collect();
        vars.extend([
            ("quantifier_style", tone.quantifier_style),
            ("banned_words", banned.as_str()),
            ("title", input.title.as_str()),
            ("steps", steps.as_str()),
            ("time_spent", time_spent.as_str()),
            ("category", input.category.as_deref().unwrap_or("unspecified")),
            ("notes", input.notes.as_deref().unwrap_or("none")),
            ("outcomes", outcomes.as_str()),
        ]);
        fill(&self.prompts.single_template, &vars)
    }

    fn parse_single(&self, text: &str, input: &SingleTaskInput) -> Option<SingleOutcome> {
        let json = parse_with_recovery(text)?;
        let obj = match json.get("entry") {
            Some(inner) if inner.is_object() => inner,
            _ => &json,
        };
        let title = str_field(obj, "title")?;
        let bullet = str_field(obj, "bullet")?;
        let theme = obj
            .get("impact_theme")
            .and_then(Value::as_str)
            .and_then(theme_from_str);

        let steps = input.steps.iter().filter(|s| !s.trim().is_empty()).count();
        let has_time = input.time_spent_minutes.unwrap_or(0) > 0;
        let has_notes = input.notes.as_deref().is_some_and(|n| !n.trim().is_empty());
        let confidence = obj
            .get("confidence")
            .and_then(Value::as_str)
            .and_then(Confidence::parse_loose)
            .unwrap_or_else(|| {
                calculate_confidence(&input.outcome_confirmations, steps, has_time, has_notes)
            });

        let entry = AchievementEntry {
            title,
            bullet,
            metrics: str_field(obj, "metrics").unwrap_or_default(),
            category: str_field(obj, "category")
                .or_else(|| input.category.clone())
                .or_else(|| theme.map(|t| t.category().to_string()))
                .unwrap_or_default(),
            tags: entry_tags(obj, theme),
            overall_impact: str_field(obj, "overall_impact"),
            task_ids: vec![0],
            count: 1,
            frequency: frequency_label(1).to_string(),
            confidence,
            accepted: false,
        };

        let text = entry_text(&entry).to_lowercase();
        let mut claims = self.policy.detect_banned_vocabulary(&entry_text(&entry));
        for (key, confirmed) in &input.outcome_confirmations {
            let name = humanize_outcome(key);
            if !confirmed && !name.is_empty() && text.contains(&name) && !claims.contains(&name) {
                claims.push(name);
            }
        }

        Some(SingleOutcome {
            entry,
            disallowed_claims: claims,
            source: GenerationSource::Model,
            fallback_reason: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// One line per theme: name, what it means, and the actions that signal it.
fn theme_lines() -> String {
    ImpactTheme::all()
        .iter()
        .map(|t| format!("  - {}: {} (e.g. {})", t.as_str(), t.description(), t.verbs().join(", ")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `[0] "Title" | 2025-03-04 | 4 steps | 45m | confirmed: shipped to production`
fn task_line(index: usize, task: &CompletedTaskRecord) -> String {
    let confirmed = task.confirmed_outcomes();
    let confirmed = if confirmed.is_empty() {
        "none".to_string()
    } else {
        confirmed
            .iter()
            .map(|k| humanize_outcome(k))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let minutes = task.total_minutes();
    let time = if minutes > 0 {
        crate::entry::format_minutes(minutes)
    } else {
        "untracked".to_string()
    };
    format!(
        "[{index}] \"{}\" | {} | {} steps | {time} | confirmed: {confirmed}",
        task.title.replace('"', "'"),
        task.date_label(),
        task.step_count()
    )
}

fn str_field(v: &Value, key: &str) -> Option<String> {
    match v.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn theme_from_str(s: &str) -> Option<ImpactTheme> {
    let norm = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
    ImpactTheme::all().iter().copied().find(|t| t.as_str() == norm)
}

fn entry_tags(obj: &Value, theme: Option<ImpactTheme>) -> Vec<String> {
    let raw: Vec<String> = obj
        .get("tags")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|t| t.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    if raw.is_empty() {
        if let Some(theme) = theme {
            return normalize_tags(&[DELIVERY_TAG, theme.tag()]);
        }
    }
    normalize_tags(&raw)
}

/// Task references as zero-based indices. Accepts numbers, numeric strings,
/// and task ids like `T3`; drops anything out of range.
fn parse_task_ids(v: Option<&Value>, tasks: &[CompletedTaskRecord]) -> Vec<usize> {
    let Some(arr) = v.and_then(Value::as_array) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for item in arr {
        let idx = match item {
            Value::Number(n) => n.as_u64().map(|n| n as usize),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<usize>()
                    .ok()
                    .or_else(|| tasks.iter().position(|t| !t.id.is_empty() && t.id == s))
            }
            _ => None,
        };
        if let Some(i) = idx {
            if i < tasks.len() && !out.contains(&i) {
                out.push(i);
            }
        }
    }
    out
}

fn parse_entry(v: &Value, tasks: &[CompletedTaskRecord]) -> Option<AchievementEntry> {
    let title = str_field(v, "title")?;
    let bullet = str_field(v, "bullet").unwrap_or_default();
    let task_ids = parse_task_ids(v.get("task_ids"), tasks);
    let theme = v
        .get("impact_theme")
        .and_then(Value::as_str)
        .and_then(theme_from_str);

    let count = v
        .get("count")
        .and_then(Value::as_u64)
        .map(|n| n as usize)
        .filter(|n| *n > 0)
        .unwrap_or_else(|| task_ids.len().max(1));

    let confidence = v
        .get("confidence")
        .and_then(Value::as_str)
        .and_then(Confidence::parse_loose)
        .unwrap_or_else(|| backfill_confidence(&task_ids, tasks));

    Some(AchievementEntry {
        title,
        bullet,
        metrics: str_field(v, "metrics").unwrap_or_default(),
        category: str_field(v, "category")
            .or_else(|| theme.map(|t| t.category().to_string()))
            .unwrap_or_default(),
        tags: entry_tags(v, theme),
        overall_impact: str_field(v, "overall_impact"),
        frequency: str_field(v, "frequency").unwrap_or_else(|| frequency_label(count).to_string()),
        task_ids,
        count,
        confidence,
        accepted: false,
    })
}

/// Confidence from the tasks an entry references. No references means no
/// evidence.
fn backfill_confidence(task_ids: &[usize], tasks: &[CompletedTaskRecord]) -> Confidence {
    let refs: Vec<&CompletedTaskRecord> = task_ids.iter().filter_map(|i| tasks.get(*i)).collect();
    let mut outcomes: BTreeMap<String, bool> = BTreeMap::new();
    for t in &refs {
        for (k, v) in &t.outcome_confirmations {
            *outcomes.entry(k.clone()).or_insert(false) |= *v;
        }
    }
    let steps = refs.iter().map(|t| t.step_count()).sum();
    let minutes: u32 = refs.iter().map(|t| t.total_minutes()).sum();
    let has_notes = refs.iter().any(|t| t.has_notes());
    calculate_confidence(&outcomes, steps, minutes > 0, has_notes)
}

fn entry_text(e: &AchievementEntry) -> String {
    let mut text = format!("{}\n{}\n{}", e.title, e.bullet, e.metrics);
    if let Some(impact) = &e.overall_impact {
        text.push('\n');
        text.push_str(impact);
    }
    text
}

/// Outcome names mentioned in an entry that are not confirmed on every
/// contributing task. Entries without task references are checked against
/// the whole input.
fn unconfirmed_claims(e: &AchievementEntry, tasks: &[CompletedTaskRecord]) -> Vec<String> {
    let contributing: Vec<&CompletedTaskRecord> = if e.task_ids.is_empty() {
        tasks.iter().collect()
    } else {
        e.task_ids.iter().filter_map(|i| tasks.get(*i)).collect()
    };
    let text = entry_text(e).to_lowercase();
    let mut keys: Vec<&str> = Vec::new();
    for t in &contributing {
        for k in t.outcome_confirmations.keys() {
            if !keys.contains(&k.as_str()) {
                keys.push(k);
            }
        }
    }
    keys.into_iter()
        .filter_map(|k| {
            let name = humanize_outcome(k);
            let mentioned = !name.is_empty() && text.contains(&name);
            let confirmed_everywhere = contributing
                .iter()
                .all(|t| t.outcome_confirmations.get(k).copied().unwrap_or(false));
            (mentioned && !confirmed_everywhere).then_some(name)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
