use super::{load_config, parse_since};
use crate::output::{print_json, print_table, truncate};
use anyhow::Context;
use brag_core::{
    entry::format_minutes,
    task::{step_label, CompletedTaskRecord, TaskStore},
};
use clap::Subcommand;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Subcommand)]
pub enum TaskSubcommand {
    /// Record a completed task
    Add {
        #[arg(required = true)]
        title: Vec<String>,
        /// A step taken; repeat for each step. A suffix like "(15m)" records its time
        #[arg(long = "step", value_name = "STEP")]
        steps: Vec<String>,
        /// Total minutes spent, when steps carry no estimates
        #[arg(long)]
        minutes: Option<u32>,
        /// Why the task mattered
        #[arg(long)]
        why: Option<String>,
        /// Free-form category, e.g. "Infrastructure"
        #[arg(long)]
        category: Option<String>,
        /// Notes about the work
        #[arg(long)]
        notes: Option<String>,
        /// Confirmed outcome, as `name` or `name=true|false`; repeatable
        #[arg(long = "outcome", value_name = "NAME[=BOOL]")]
        outcomes: Vec<String>,
        /// Completion date (YYYY-MM-DD or RFC 3339); defaults to now
        #[arg(long)]
        completed: Option<String>,
    },
    /// List completed tasks
    List {
        /// Only tasks completed since (YYYY-MM-DD, RFC 3339, or <N>d)
        #[arg(long)]
        since: Option<String>,
    },
    /// Show one task in full
    Show { id: String },
}

pub fn run(root: &Path, subcmd: TaskSubcommand, json: bool) -> anyhow::Result<()> {
    load_config(root)?;
    let store = TaskStore::new(root);
    match subcmd {
        TaskSubcommand::Add {
            title,
            steps,
            minutes,
            why,
            category,
            notes,
            outcomes,
            completed,
        } => {
            let mut task = CompletedTaskRecord::new(title.join(" "));
            task.steps = steps;
            task.minutes = minutes.unwrap_or(0);
            task.core_why = why;
            task.category = category;
            task.notes = notes;
            task.outcome_confirmations = parse_outcomes(&outcomes)?;
            task.completed_at = completed.as_deref().map(parse_since).transpose()?;
            add(&store, task, json)
        }
        TaskSubcommand::List { since } => list(&store, since.as_deref(), json),
        TaskSubcommand::Show { id } => show(&store, &id, json),
    }
}

fn parse_outcomes(raw: &[String]) -> anyhow::Result<BTreeMap<String, bool>> {
    let mut map = BTreeMap::new();
    for item in raw {
        let (name, value) = match item.split_once('=') {
            Some((n, v)) => {
                let v = v
                    .trim()
                    .parse::<bool>()
                    .with_context(|| format!("--outcome {item}: value must be true or false"))?;
                (n.trim(), v)
            }
            None => (item.trim(), true),
        };
        if name.is_empty() {
            anyhow::bail!("--outcome needs a name");
        }
        map.insert(name.to_string(), value);
    }
    Ok(map)
}

fn add(store: &TaskStore, task: CompletedTaskRecord, json: bool) -> anyhow::Result<()> {
    let task = store.add(task).context("failed to record task")?;
    if json {
        print_json(&task)?;
    } else {
        println!("Recorded {}: {}", task.id, task.title);
    }
    Ok(())
}

fn list(store: &TaskStore, since: Option<&str>, json: bool) -> anyhow::Result<()> {
    let since = since.map(parse_since).transpose()?;
    let tasks = store.completed_since(since).context("failed to load tasks")?;
    if json {
        return print_json(&tasks);
    }
    if tasks.is_empty() {
        println!("No completed tasks.");
        return Ok(());
    }
    let rows = tasks
        .iter()
        .map(|t| {
            vec![
                t.id.clone(),
                t.date_label(),
                truncate(&t.title, 48),
                t.step_count().to_string(),
                time_cell(t),
                t.confirmed_outcomes().join(","),
            ]
        })
        .collect();
    print_table(&["ID", "DATE", "TITLE", "STEPS", "TIME", "CONFIRMED"], rows);
    Ok(())
}

fn show(store: &TaskStore, id: &str, json: bool) -> anyhow::Result<()> {
    let task = store.get(id).with_context(|| format!("failed to load task {id}"))?;
    if json {
        return print_json(&task);
    }
    println!("{}: {}", task.id, task.title);
    println!("completed: {}", task.date_label());
    println!("time:      {}", time_cell(&task));
    if let Some(c) = &task.category {
        println!("category:  {c}");
    }
    if let Some(w) = &task.core_why {
        println!("why:       {w}");
    }
    if let Some(n) = &task.notes {
        println!("notes:     {n}");
    }
    if !task.outcome_confirmations.is_empty() {
        let flags: Vec<String> = task
            .outcome_confirmations
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        println!("outcomes:  {}", flags.join(", "));
    }
    if !task.steps.is_empty() {
        println!("steps:");
        for (i, s) in task.steps.iter().enumerate() {
            println!("  {}. {}", i + 1, step_label(s));
        }
    }
    if let Some(s) = &task.accepted_statement {
        println!("accepted:  {s}");
    }
    Ok(())
}

fn time_cell(task: &CompletedTaskRecord) -> String {
    if task.has_time_tracked() {
        format_minutes(task.total_minutes())
    } else {
        "-".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcomes_default_to_true() {
        let map = parse_outcomes(&["shipped".into(), "adopted=false".into()]).unwrap();
        assert_eq!(map.get("shipped"), Some(&true));
        assert_eq!(map.get("adopted"), Some(&false));
    }

    #[test]
    fn outcomes_reject_bad_values() {
        assert!(parse_outcomes(&["shipped=maybe".into()]).is_err());
        assert!(parse_outcomes(&["=true".into()]).is_err());
    }
}
