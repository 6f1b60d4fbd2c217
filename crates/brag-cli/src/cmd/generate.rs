use super::{load_config, parse_since, show::print_batch};
use crate::output::print_json;
use anyhow::Context;
use brag_core::{
    config::BragConfig,
    entry::{BatchOutcome, SingleOutcome, SingleTaskInput},
    generator::StatementGenerator,
    task::TaskStore,
    types::{Seniority, Wording},
    workflow::{GenerateRequest, ReviewSession},
};
use clap::Args;
use std::path::Path;

#[derive(Args, Debug, Clone, Default)]
pub struct GenerateArgs {
    /// Generate one statement for this task id instead of a batch
    #[arg(long, value_name = "TASK_ID")]
    pub single: Option<String>,
    /// ic, senior, or lead (default: profile.seniority)
    #[arg(long)]
    pub seniority: Option<String>,
    /// safe or ambitious (default: profile.wording)
    #[arg(long)]
    pub wording: Option<String>,
    /// Skip the model and use template synthesis
    #[arg(long)]
    pub offline: bool,
    /// Only tasks completed since (YYYY-MM-DD, RFC 3339, or <N>d)
    #[arg(long)]
    pub since: Option<String>,
}

impl GenerateArgs {
    /// Resolve modes and window against the config defaults.
    pub fn request(&self, config: &BragConfig) -> anyhow::Result<GenerateRequest> {
        let seniority = match &self.seniority {
            Some(s) => s.parse::<Seniority>()?,
            None => config.profile.seniority,
        };
        let wording = match &self.wording {
            Some(w) => w.parse::<Wording>()?,
            None => config.profile.wording,
        };
        let since = self.since.as_deref().map(parse_since).transpose()?;
        Ok(GenerateRequest {
            seniority,
            wording,
            since,
        })
    }
}

pub fn run(root: &Path, args: GenerateArgs, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let request = args.request(&config)?;
    let generator = StatementGenerator::for_project(root, &config, args.offline)
        .context("failed to prepare generator")?;

    if let Some(task_id) = &args.single {
        return single(root, &generator, task_id, &request, json);
    }

    let mut session = ReviewSession::open(root, generator).context("failed to open review")?;
    let outcome = session
        .generate(&request)
        .context("failed to generate batch")?;
    if json {
        return print_json(&outcome);
    }
    print_outcome(&outcome);
    Ok(())
}

pub(crate) fn print_outcome(outcome: &BatchOutcome) {
    if outcome.batch.entries.is_empty() {
        println!("No completed tasks to summarize.");
        return;
    }
    if let Some(reason) = &outcome.fallback_reason {
        println!("note: model unavailable ({reason}); used template synthesis");
    }
    print_batch(&outcome.batch);
    if !outcome.violations.is_empty() {
        println!("\nwarning: banned vocabulary: {}", outcome.violations.join(", "));
    }
    if !outcome.unconfirmed_outcomes.is_empty() {
        println!(
            "warning: claims not confirmed by any task: {}",
            outcome.unconfirmed_outcomes.join(", ")
        );
    }
}

fn single(
    root: &Path,
    generator: &StatementGenerator,
    task_id: &str,
    request: &GenerateRequest,
    json: bool,
) -> anyhow::Result<()> {
    let task = TaskStore::new(root)
        .get(task_id)
        .with_context(|| format!("failed to load task {task_id}"))?;
    let input = SingleTaskInput::from(&task);
    let outcome = generator
        .generate_single(&input, request.seniority, request.wording)
        .context("failed to generate statement")?;
    if json {
        return print_json(&outcome);
    }
    print_single(&outcome);
    Ok(())
}

fn print_single(outcome: &SingleOutcome) {
    if let Some(reason) = &outcome.fallback_reason {
        println!("note: model unavailable ({reason}); used template synthesis");
    }
    let e = &outcome.entry;
    println!("{}  [{}]", e.title, outcome.source);
    println!("  {}", e.bullet);
    println!("  Metrics: {}", e.metrics);
    println!("  Tags: {} | Confidence: {}", e.tags.join(", "), e.confidence);
    if !outcome.disallowed_claims.is_empty() {
        println!(
            "warning: disallowed claims: {}",
            outcome.disallowed_claims.join(", ")
        );
    }
}
