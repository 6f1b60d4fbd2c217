use crate::output::print_json;
use anyhow::Context;
use brag_core::{entry::GenerationBatch, store::EntryStore};
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    super::load_config(root)?;
    let batch = EntryStore::new(root)
        .load_batch()
        .context("failed to load generated batch")?;
    if json {
        return print_json(&batch);
    }
    match batch {
        Some(batch) if !batch.entries.is_empty() => print_batch(&batch),
        Some(_) => println!("The current batch has no entries."),
        None => println!("No generated batch. Run `brag generate`."),
    }
    Ok(())
}

pub(crate) fn print_batch(batch: &GenerationBatch) {
    println!(
        "Batch from {} ({} source, {} / {})",
        batch.generated_at.format("%Y-%m-%d %H:%M"),
        batch.source,
        batch.seniority,
        batch.wording
    );
    for (i, e) in batch.entries.iter().enumerate() {
        let mark = if e.accepted { "  (accepted)" } else { "" };
        println!("\n[{i}] {}{mark}", e.title);
        println!("    {}", e.bullet);
        println!("    Metrics: {}", e.metrics);
        if let Some(impact) = &e.overall_impact {
            println!("    Impact: {impact}");
        }
        println!(
            "    Tags: {} | {} | confidence {}",
            e.tags.join(", "),
            e.frequency,
            e.confidence
        );
        let ids = batch.source_task_ids(e);
        if !ids.is_empty() {
            println!("    Tasks: {}", ids.join(", "));
        }
    }
    let s = &batch.summary;
    println!(
        "\nSummary: {} task(s), {} invested, top category {}",
        s.total_tasks, s.time_invested, s.top_category
    );
    if !s.overall_impact.is_empty() {
        println!("  {}", s.overall_impact);
    }
}
