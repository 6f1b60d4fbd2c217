//! Prompt templates for statement generation.
//!
//! Built-in templates can be overridden field-by-field from
//! `.brag/prompts.yaml`. The book is loaded once per process and shared
//! read-only through an `Arc`.

use crate::error::Result;
use crate::paths;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

/// System prompt for batch generation; enforces JSON-only output.
pub const BATCH_SYSTEM: &str = "You write factual, resume-style achievement statements \
from a person's completed work. You MUST respond with valid JSON only. \
Do NOT include any text outside the JSON object. \
Do NOT use markdown code fences. \
Never claim an outcome, metric, or result that is not listed as confirmed.";

/// Batch template. Placeholders: `{seniority}`, `{max_scope}`, `{emphasis}`,
/// `{assertiveness}`, `{quantifier_style}`, `{allowed_verbs}`,
/// `{banned_words}`, `{themes}`, `{tags}`, `{tasks}`.
pub const BATCH_TEMPLATE: &str = r#"Turn the completed tasks below into achievement statements for a {seniority}.

Scope: claim nothing beyond {max_scope}. Emphasize {emphasis}.
Tone: {assertiveness}. Numbers: {quantifier_style}.

RULES:
- Group related tasks. Produce at most 5-7 entries in total.
- Start every bullet with a verb from this list and no other: {allowed_verbs}
- Never use these words: {banned_words}
- Describe controlled actions and internal impact only.
- "metrics" describes effort only (time, counts, steps). Never invent outcome numbers.
- Mention an outcome only if it is listed under "confirmed" for every task in the entry.
- "impact_theme" must be one of these theme names:
{themes}
- "tags" holds 1-3 values from: {tags}
- "task_ids" lists the zero-based indices of the tasks an entry summarizes.

TASKS:
{tasks}

Return a JSON object with this EXACT schema:
{
  "entries": [
    {
      "title": "Short title",
      "bullet": "One sentence starting with an allowed verb.",
      "metrics": "2h 30m across 3 tasks, 9 steps",
      "category": "Delivery",
      "impact_theme": "execution_quality",
      "tags": ["DELIVERY"],
      "overall_impact": "Optional longer sentence.",
      "task_ids": [0, 2],
      "frequency": "One-time",
      "confidence": "medium"
    }
  ],
  "summary": {
    "top_category": "Delivery",
    "overall_impact": "One sentence describing the aggregate contribution."
  }
}"#;

/// System prompt for single-task generation.
pub const SINGLE_SYSTEM: &str = "You write one factual, resume-style achievement statement \
for a single completed task. You MUST respond with valid JSON only. \
Do NOT include any text outside the JSON object. \
Do NOT use markdown code fences.";

/// Single-task template. Placeholders: `{seniority}`, `{max_scope}`,
/// `{assertiveness}`, `{quantifier_style}`, `{allowed_verbs}`,
/// `{banned_words}`, `{themes}`, `{tags}`, `{title}`, `{steps}`,
/// `{time_spent}`, `{category}`, `{notes}`, `{outcomes}`.
pub const SINGLE_TEMPLATE: &str = r#"Write one achievement statement for a {seniority} from this completed task.

Scope: claim nothing beyond {max_scope}.
Tone: {assertiveness}. Numbers: {quantifier_style}.

RULES:
- Start the bullet with a verb from this list and no other: {allowed_verbs}
- Never use these words: {banned_words}
- Only outcomes marked true below may be mentioned.
- "impact_theme" must be one of these theme names:
{themes}
- "tags" holds 1-3 values from: {tags}

TASK:
Title: {title}
Steps:
{steps}
Time spent: {time_spent}
Category: {category}
Notes: {notes}
Outcome confirmations:
{outcomes}

Return a JSON object with this EXACT schema:
{
  "title": "Short title",
  "bullet": "One sentence starting with an allowed verb.",
  "metrics": "45m, 4 steps",
  "category": "Delivery",
  "impact_theme": "execution_quality",
  "tags": ["DELIVERY"],
  "overall_impact": "Optional longer sentence.",
  "confidence": "medium"
}"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptBook {
    pub batch_system: String,
    pub batch_template: String,
    pub single_system: String,
    pub single_template: String,
}

/// On-disk overrides; any field left out keeps the built-in text.
#[derive(Debug, Default, Deserialize)]
struct PromptOverrides {
    batch_system: Option<String>,
    batch_template: Option<String>,
    single_system: Option<String>,
    single_template: Option<String>,
}

impl Default for PromptBook {
    fn default() -> Self {
        Self {
            batch_system: BATCH_SYSTEM.to_string(),
            batch_template: BATCH_TEMPLATE.to_string(),
            single_system: SINGLE_SYSTEM.to_string(),
            single_template: SINGLE_TEMPLATE.to_string(),
        }
    }
}

impl PromptBook {
    pub fn load(root: &Path) -> Result<Self> {
        let mut book = Self::default();
        let Some(data) = crate::io::read_optional(&paths::prompts_path(root))? else {
            return Ok(book);
        };
        if data.trim().is_empty() {
            return Ok(book);
        }
        let o: PromptOverrides = serde_yaml::from_str(&data)?;
        if let Some(v) = o.batch_system {
            book.batch_system = v;
        }
        if let Some(v) = o.batch_template {
            book.batch_template = v;
        }
        if let Some(v) = o.single_system {
            book.single_system = v;
        }
        if let Some(v) = o.single_template {
            book.single_template = v;
        }
        Ok(book)
    }
}

static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();

fn placeholder_re() -> &'static Regex {
    PLACEHOLDER_RE.get_or_init(|| Regex::new(r"\{([a-z_]+)\}").unwrap())
}

/// Replace each `{key}` in `template` with its value in a single pass, so
/// substituted values are never expanded again. Unknown placeholders and
/// literal JSON braces are left alone.
pub fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    placeholder_re()
        .replace_all(template, |caps: &Captures<'_>| {
            let key = &caps[1];
            match vars.iter().find(|(k, _)| *k == key) {
                Some((_, value)) => (*value).to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn fill_replaces_known_keys_only() {
        let out = fill("Hi {name}, {\"a\": 1} {other}", &[("name", "Sam")]);
        assert_eq!(out, "Hi Sam, {\"a\": 1} {other}");
    }

    #[test]
    fn fill_does_not_expand_substituted_values() {
        let out = fill(
            "Title: {title}\nNotes: {notes}",
            &[("title", "Fix {notes} rendering"), ("notes", "internal")],
        );
        assert_eq!(out, "Title: Fix {notes} rendering\nNotes: internal");
    }

    #[test]
    fn load_without_file_uses_builtins() {
        let dir = TempDir::new().unwrap();
        assert_eq!(PromptBook::load(dir.path()).unwrap(), PromptBook::default());
    }

    #[test]
    fn load_overrides_per_field() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".brag")).unwrap();
        std::fs::write(
            dir.path().join(".brag/prompts.yaml"),
            "single_system: Be brief.\n",
        )
        .unwrap();
        let book = PromptBook::load(dir.path()).unwrap();
        assert_eq!(book.single_system, "Be brief.");
        assert_eq!(book.batch_template, BATCH_TEMPLATE);
    }

    #[test]
    fn builtin_templates_carry_their_placeholders() {
        for key in ["{allowed_verbs}", "{banned_words}", "{themes}", "{tasks}"] {
            assert!(BATCH_TEMPLATE.contains(key), "batch template missing {key}");
        }
        for key in ["{title}", "{steps}", "{outcomes}", "{allowed_verbs}"] {
            assert!(SINGLE_TEMPLATE.contains(key), "single template missing {key}");
        }
    }
}
