//! Deterministic, template-based entry synthesis.
//!
//! Used whenever the text-generation capability is unavailable or returns
//! something unusable, so generation always yields a batch. Every word in
//! the output comes from the approved verb and theme-phrase tables or from
//! the user's own task text with banned vocabulary scrubbed out.

use crate::entry::{
    format_minutes, frequency_label, AchievementEntry, BatchSummary, GenerationBatch,
    SingleTaskInput,
};
use crate::task::CompletedTaskRecord;
use crate::types::{GenerationSource, Seniority, Wording};
use crate::vocabulary::{
    calculate_confidence, infer_impact_theme, normalize_tags, ImpactTheme, SeniorityProfile,
    VocabularyPolicy, DELIVERY_TAG,
};
use chrono::Utc;
use std::collections::BTreeMap;

const GROUP_KEY_WORDS: usize = 3;

/// Lower-cased first three words of a title. Approximate clustering only:
/// "Email Q3 update" and "Email q3 update draft" share a group, synonyms don't.
pub fn group_key(title: &str) -> String {
    title
        .split_whitespace()
        .take(GROUP_KEY_WORDS)
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Indices of `tasks` grouped by [`group_key`], in order of first appearance.
fn group_tasks(tasks: &[CompletedTaskRecord]) -> Vec<Vec<usize>> {
    let mut keys: Vec<String> = Vec::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (i, task) in tasks.iter().enumerate() {
        let key = group_key(&task.title);
        match keys.iter().position(|k| *k == key) {
            Some(pos) => groups[pos].push(i),
            None => {
                keys.push(key);
                groups.push(vec![i]);
            }
        }
    }
    groups
}

pub fn synthesize_batch(
    tasks: &[CompletedTaskRecord],
    seniority: Seniority,
    wording: Wording,
    policy: &VocabularyPolicy,
) -> GenerationBatch {
    if tasks.is_empty() {
        return GenerationBatch::empty(seniority, wording);
    }

    let verb = SeniorityProfile::lead_verb(seniority, wording);
    let entries: Vec<AchievementEntry> = group_tasks(tasks)
        .into_iter()
        .map(|indices| group_entry(tasks, indices, verb, policy))
        .collect();

    let overall = format!(
        "{verb} {} task(s), summarized as {} achievement(s).",
        tasks.len(),
        entries.len()
    );
    let summary = BatchSummary::compute(tasks, &entries, overall);

    GenerationBatch {
        entries,
        summary,
        source: GenerationSource::Fallback,
        generated_at: Utc::now(),
        seniority,
        wording,
        task_refs: tasks.iter().map(|t| t.id.clone()).collect(),
    }
}

fn group_entry(
    tasks: &[CompletedTaskRecord],
    indices: Vec<usize>,
    verb: &str,
    policy: &VocabularyPolicy,
) -> AchievementEntry {
    let group: Vec<&CompletedTaskRecord> = indices.iter().map(|i| &tasks[*i]).collect();
    let count = group.len();
    let steps: usize = group.iter().map(|t| t.step_count()).sum();
    let minutes: u32 = group.iter().map(|t| t.total_minutes()).sum();
    let has_notes = group.iter().any(|t| t.has_notes());

    // A flag counts as confirmed for the group if any task confirms it.
    let mut outcomes: BTreeMap<String, bool> = BTreeMap::new();
    for t in &group {
        for (k, v) in &t.outcome_confirmations {
            *outcomes.entry(k.clone()).or_insert(false) |= *v;
        }
    }
    let confidence = calculate_confidence(&outcomes, steps, minutes > 0, has_notes);

    let context = group
        .iter()
        .filter_map(|t| t.core_why.as_deref())
        .collect::<Vec<_>>()
        .join(" ");
    let all_steps: Vec<&str> = group
        .iter()
        .flat_map(|t| t.steps.iter().map(String::as_str))
        .collect();
    let theme = infer_impact_theme(&context, &all_steps);

    let first_title = policy.scrub(&group[0].title);
    let (title, subject) = if count == 1 {
        let subject = if first_title.is_empty() {
            "assigned work".to_string()
        } else {
            lower_first(&first_title)
        };
        (fallback_title(&first_title), subject)
    } else {
        let prefix = policy.scrub(
            &group[0]
                .title
                .split_whitespace()
                .take(GROUP_KEY_WORDS)
                .collect::<Vec<_>>()
                .join(" "),
        );
        let prefix = fallback_title(&prefix);
        (
            format!("{prefix} ({count} tasks)"),
            format!("{count} related tasks on {}", lower_first(&prefix)),
        )
    };

    AchievementEntry {
        title,
        bullet: format!("{verb} {subject}, {}.", theme.impact_phrase()),
        metrics: effort_metrics(minutes, count, steps),
        category: theme.category().to_string(),
        tags: theme_tags(theme),
        overall_impact: Some(format!(
            "Sustained {} through {count} completed task(s).",
            theme.impact_phrase()
        )),
        task_ids: indices,
        count,
        frequency: frequency_label(count).to_string(),
        confidence,
        accepted: false,
    }
}

/// Template entry for one task, led by the first allowed verb.
pub fn synthesize_single(
    input: &SingleTaskInput,
    seniority: Seniority,
    policy: &VocabularyPolicy,
) -> AchievementEntry {
    let verb = SeniorityProfile::for_mode(seniority)
        .allowed_verbs
        .first()
        .copied()
        .unwrap_or("Completed");
    let steps = input.steps.iter().filter(|s| !s.trim().is_empty()).count();
    let minutes = input.time_spent_minutes.unwrap_or(0);
    let has_notes = input.notes.as_deref().is_some_and(|n| !n.trim().is_empty());
    let confidence = calculate_confidence(&input.outcome_confirmations, steps, minutes > 0, has_notes);
    let theme = infer_impact_theme(input.category.as_deref().unwrap_or(""), &input.steps);

    let title = policy.scrub(&input.title);
    let subject = if title.is_empty() {
        "assigned work".to_string()
    } else {
        lower_first(&title)
    };

    AchievementEntry {
        title: fallback_title(&title),
        bullet: format!("{verb} {subject}, {}.", theme.impact_phrase()),
        metrics: effort_metrics(minutes, 1, steps),
        category: theme.category().to_string(),
        tags: theme_tags(theme),
        overall_impact: None,
        task_ids: vec![0],
        count: 1,
        frequency: frequency_label(1).to_string(),
        confidence,
        accepted: false,
    }
}

fn theme_tags(theme: ImpactTheme) -> Vec<String> {
    normalize_tags(&[DELIVERY_TAG, theme.tag()])
}

fn effort_metrics(minutes: u32, tasks: usize, steps: usize) -> String {
    if minutes > 0 {
        format!(
            "{} invested across {tasks} task(s), {steps} steps completed",
            format_minutes(minutes)
        )
    } else {
        format!("{steps} steps completed across {tasks} task(s)")
    }
}

fn fallback_title(scrubbed: &str) -> String {
    if scrubbed.is_empty() {
        "Completed work".to_string()
    } else {
        scrubbed.to_string()
    }
}

/// Lower-case the first character unless the first word looks like an
/// acronym (`API rollout` stays as is).
fn lower_first(s: &str) -> String {
    let first_word = s.split_whitespace().next().unwrap_or("");
    let is_acronym = first_word.chars().filter(|c| c.is_alphabetic()).count() > 1
        && first_word
            .chars()
            .filter(|c| c.is_alphabetic())
            .all(|c| c.is_uppercase());
    if is_acronym {
        return s.to_string();
    }
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Confidence;

    fn task(title: &str, steps: &[&str], minutes: u32) -> CompletedTaskRecord {
        let mut t = CompletedTaskRecord::new(title);
        t.steps = steps.iter().map(|s| s.to_string()).collect();
        t.minutes = minutes;
        t
    }

    fn policy() -> &'static VocabularyPolicy {
        VocabularyPolicy::builtin()
    }

    #[test]
    fn five_email_tasks_group_into_one_entry() {
        let tasks: Vec<_> = (0..5)
            .map(|i| {
                let mut t = task("Email vendor follow up", &["Draft", "Send"], 10);
                t.id = format!("T{}", i + 1);
                t
            })
            .collect();
        let batch = synthesize_batch(&tasks, Seniority::Ic, Wording::Safe, policy());
        assert_eq!(batch.source, GenerationSource::Fallback);
        assert_eq!(batch.entries.len(), 1);
        let e = &batch.entries[0];
        assert_eq!(e.count, 5);
        assert!(e.tags.contains(&"DELIVERY".to_string()));
        assert!(e.metrics.contains("across 5 task(s)"), "{}", e.metrics);
        assert_eq!(e.task_ids, vec![0, 1, 2, 3, 4]);
        assert_eq!(batch.task_refs, vec!["T1", "T2", "T3", "T4", "T5"]);
        assert_eq!(batch.summary.total_tasks, 5);
        assert_eq!(batch.summary.total_minutes, 50);
    }

    #[test]
    fn grouping_uses_first_three_words_case_insensitive() {
        let tasks = vec![
            task("Prep Sprint Demo slides", &[], 0),
            task("prep sprint demo recording", &[], 0),
            task("Prep sprint retro", &[], 0),
        ];
        let batch = synthesize_batch(&tasks, Seniority::Ic, Wording::Safe, policy());
        assert_eq!(batch.entries.len(), 2);
        assert_eq!(batch.entries[0].task_ids, vec![0, 1]);
        assert_eq!(batch.entries[1].task_ids, vec![2]);
    }

    #[test]
    fn verb_follows_seniority_and_wording() {
        let tasks = vec![task("Update runbook", &[], 0)];
        let ic = synthesize_batch(&tasks, Seniority::Ic, Wording::Ambitious, policy());
        assert!(ic.entries[0].bullet.starts_with("Completed "));
        let lead = synthesize_batch(&tasks, Seniority::Lead, Wording::Safe, policy());
        assert!(lead.entries[0].bullet.starts_with("Led "));
        let lead_bold = synthesize_batch(&tasks, Seniority::Lead, Wording::Ambitious, policy());
        assert!(lead_bold.entries[0].bullet.starts_with("Directed "));
    }

    #[test]
    fn theme_drives_tags_and_phrase() {
        let mut t = task("Audit access list", &["Review permissions", "Check owners"], 30);
        t.core_why = Some("Quarterly control".into());
        let batch = synthesize_batch(&[t], Seniority::Ic, Wording::Safe, policy());
        let e = &batch.entries[0];
        assert_eq!(e.tags, vec!["DELIVERY", "RISK_REDUCTION"]);
        assert!(e.bullet.contains("reducing risk of oversight"), "{}", e.bullet);

        let plain = synthesize_batch(&[task("Ship build", &[], 0)], Seniority::Ic, Wording::Safe, policy());
        assert_eq!(plain.entries[0].tags, vec!["DELIVERY"]);
    }

    #[test]
    fn batch_theme_reads_core_why_not_task_category() {
        let mut t = task("Merge payment patch", &["Review diff"], 20);
        t.category = Some("Delivery".into());
        let batch = synthesize_batch(&[t.clone()], Seniority::Ic, Wording::Safe, policy());
        assert_eq!(batch.entries[0].tags, vec!["DELIVERY", "RISK_REDUCTION"]);

        t.core_why = Some("Preparation for the audit".into());
        let batch = synthesize_batch(&[t], Seniority::Ic, Wording::Safe, policy());
        assert_eq!(batch.entries[0].tags, vec!["DELIVERY", "DECISION_READINESS"]);
    }

    #[test]
    fn confidence_uses_any_confirmed_outcome_in_group() {
        let mut a = task("Release mobile app", &["a", "b"], 30);
        a.outcome_confirmations.insert("shipped_to_production".into(), true);
        let b = task("Release mobile app hotfix", &["c"], 15);
        let batch = synthesize_batch(&[a, b], Seniority::Ic, Wording::Safe, policy());
        assert_eq!(batch.entries.len(), 1);
        assert_eq!(batch.entries[0].confidence, Confidence::High);
    }

    #[test]
    fn empty_input_gives_empty_fallback_batch() {
        let batch = synthesize_batch(&[], Seniority::Senior, Wording::Safe, policy());
        assert!(batch.entries.is_empty());
        assert_eq!(batch.source, GenerationSource::Fallback);
        assert_eq!(batch.summary.total_tasks, 0);
    }

    #[test]
    fn banned_words_in_titles_are_scrubbed() {
        let t = task("Crushed it on the synergy deck", &[], 20);
        let batch = synthesize_batch(&[t], Seniority::Ic, Wording::Safe, policy());
        let e = &batch.entries[0];
        for text in [&e.title, &e.bullet, &e.metrics] {
            assert!(policy().detect_banned_vocabulary(text).is_empty(), "{text}");
        }
    }

    #[test]
    fn acronyms_keep_their_case() {
        assert_eq!(lower_first("API rollout"), "API rollout");
        assert_eq!(lower_first("Draft plan"), "draft plan");
        assert_eq!(lower_first("A plan"), "a plan");
    }

    #[test]
    fn fallback_entries_never_contain_banned_vocabulary() {
        let pool = [
            "Email", "vendor", "crushed", "it", "review", "synergy", "moved", "the", "needle",
            "Drafted", "10x", "report", "rockstar", "template", "increased", "revenue", "help",
            "massive", "Q3", "plan", "world-class", "update", "guaranteed", "support",
        ];
        // Small LCG so the sets vary but the test stays reproducible.
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = |n: usize| {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((seed >> 33) as usize) % n
        };
        for round in 0..200 {
            let task_count = 1 + next(8);
            let tasks: Vec<CompletedTaskRecord> = (0..task_count)
                .map(|_| {
                    let words = 1 + next(6);
                    let title: Vec<&str> = (0..words).map(|_| pool[next(pool.len())]).collect();
                    let steps: Vec<String> = (0..next(5))
                        .map(|_| format!("{} {}", pool[next(pool.len())], pool[next(pool.len())]))
                        .collect();
                    let mut t = CompletedTaskRecord::new(title.join(" "));
                    t.steps = steps;
                    t.minutes = next(3) as u32 * 25;
                    if next(2) == 0 {
                        t.core_why = Some(pool[next(pool.len())].to_string());
                    }
                    t
                })
                .collect();
            let seniority = Seniority::all()[round % 3];
            let wording = if round % 2 == 0 { Wording::Safe } else { Wording::Ambitious };
            let batch = synthesize_batch(&tasks, seniority, wording, policy());
            for e in &batch.entries {
                let fields = [
                    e.title.as_str(),
                    e.bullet.as_str(),
                    e.metrics.as_str(),
                    e.overall_impact.as_deref().unwrap_or(""),
                ];
                for f in fields {
                    let hits = policy().detect_banned_vocabulary(f);
                    assert!(hits.is_empty(), "round {round}: {f:?} contains {hits:?}");
                }
            }
        }
    }

    #[test]
    fn single_uses_first_allowed_verb() {
        let input = SingleTaskInput {
            title: "Prepare onboarding checklist".into(),
            steps: vec!["List accounts".into(), "Share template".into(), "Review".into()],
            time_spent_minutes: Some(40),
            category: Some("Documentation".into()),
            notes: None,
            outcome_confirmations: BTreeMap::new(),
        };
        let e = synthesize_single(&input, Seniority::Senior, policy());
        assert!(e.bullet.starts_with("Delivered "), "{}", e.bullet);
        assert_eq!(e.tags, vec!["DELIVERY", "CLARITY"]);
        assert_eq!(e.confidence, Confidence::Medium);
        assert!(e.metrics.contains("40m"));
    }
}
