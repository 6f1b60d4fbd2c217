use crate::output::print_json;
use anyhow::Context;
use brag_core::{entry::EntryPatch, store::EntryStore, types::Confidence};
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum EntrySubcommand {
    /// Overwrite fields of a generated entry
    Edit {
        index: usize,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        bullet: Option<String>,
        #[arg(long)]
        metrics: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
        #[arg(long, conflicts_with = "clear_impact")]
        impact: Option<String>,
        /// Remove the overall impact line
        #[arg(long)]
        clear_impact: bool,
        /// high, medium, or low
        #[arg(long)]
        confidence: Option<String>,
    },
    /// Remove a generated entry from the batch
    Delete { index: usize },
}

pub fn run(root: &Path, subcmd: EntrySubcommand, json: bool) -> anyhow::Result<()> {
    super::load_config(root)?;
    let store = EntryStore::new(root);
    match subcmd {
        EntrySubcommand::Edit {
            index,
            title,
            bullet,
            metrics,
            category,
            tags,
            impact,
            clear_impact,
            confidence,
        } => {
            let confidence = confidence
                .as_deref()
                .map(|c| {
                    Confidence::parse_loose(c)
                        .with_context(|| format!("--confidence '{c}': expected high, medium, or low"))
                })
                .transpose()?;
            let patch = EntryPatch {
                title,
                bullet,
                metrics,
                category,
                tags: tags.map(|t| t.split(',').map(|s| s.trim().to_string()).collect()),
                overall_impact: if clear_impact { Some(None) } else { impact.map(Some) },
                frequency: None,
                confidence,
            };
            edit(&store, index, &patch, json)
        }
        EntrySubcommand::Delete { index } => delete(&store, index, json),
    }
}

fn edit(store: &EntryStore, index: usize, patch: &EntryPatch, json: bool) -> anyhow::Result<()> {
    if patch.is_empty() {
        anyhow::bail!("nothing to change; pass at least one field flag");
    }
    let updated = store
        .update_generated_entry(index, patch)
        .with_context(|| format!("failed to update entry {index}"))?;
    if json {
        print_json(&updated)?;
    } else {
        println!("Updated [{index}] {}", updated.title);
    }
    Ok(())
}

fn delete(store: &EntryStore, index: usize, json: bool) -> anyhow::Result<()> {
    let removed = store
        .delete_generated_entry(index)
        .with_context(|| format!("failed to delete entry {index}"))?;
    if json {
        print_json(&removed)?;
    } else {
        println!("Deleted [{index}] {}", removed.title);
    }
    Ok(())
}
