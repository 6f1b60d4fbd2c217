use crate::output::{print_json, print_table, truncate};
use anyhow::Context;
use brag_core::store::EntryStore;
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum LedgerSubcommand {
    /// List accepted entries with their positions and ids
    List,
    /// Print the brag list Markdown
    Show,
    /// Remove an accepted entry by position or by id
    Delete {
        /// Position in the list (see `brag ledger list`)
        #[arg(required_unless_present = "id", conflicts_with = "id")]
        index: Option<usize>,
        /// Id from the entry's hidden marker
        #[arg(long)]
        id: Option<String>,
    },
}

pub fn run(root: &Path, subcmd: LedgerSubcommand, json: bool) -> anyhow::Result<()> {
    super::load_config(root)?;
    let store = EntryStore::new(root);
    match subcmd {
        LedgerSubcommand::List => list(&store, json),
        LedgerSubcommand::Show => show(&store, json),
        LedgerSubcommand::Delete { index, id } => delete(&store, index, id.as_deref(), json),
    }
}

fn list(store: &EntryStore, json: bool) -> anyhow::Result<()> {
    let blocks = store.ledger_entries().context("failed to read brag list")?;
    if json {
        return print_json(&blocks);
    }
    if blocks.is_empty() {
        println!("The brag list is empty.");
        return Ok(());
    }
    let rows = blocks
        .iter()
        .map(|b| {
            vec![
                b.index.to_string(),
                b.id.clone().unwrap_or_else(|| "-".to_string()),
                truncate(&b.title, 60),
            ]
        })
        .collect();
    print_table(&["#", "ID", "TITLE"], rows);
    Ok(())
}

fn show(store: &EntryStore, json: bool) -> anyhow::Result<()> {
    let text = store.read_ledger().context("failed to read brag list")?;
    if json {
        return print_json(&serde_json::json!({ "markdown": text }));
    }
    print!("{text}");
    Ok(())
}

fn delete(
    store: &EntryStore,
    index: Option<usize>,
    id: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let removed = match (id, index) {
        (Some(id), _) => store
            .delete_ledger_entry(id)
            .with_context(|| format!("failed to delete brag list entry {id}"))?,
        (None, Some(index)) => store
            .delete_ledger_entry_at(index)
            .with_context(|| format!("failed to delete brag list entry #{index}"))?,
        (None, None) => anyhow::bail!("pass an index or --id"),
    };
    if json {
        print_json(&removed)?;
    } else {
        println!("Removed #{} {}", removed.index, removed.title);
    }
    Ok(())
}
