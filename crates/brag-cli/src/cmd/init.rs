use anyhow::Context;
use brag_core::{config::BragConfig, io, ledger::LEDGER_HEADER, paths};
use std::path::Path;

pub fn run(root: &Path) -> anyhow::Result<()> {
    println!("Initializing brag list in: {}", root.display());

    let dir = paths::brag_dir(root);
    io::ensure_dir(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    if !paths::config_path(root).exists() {
        BragConfig::default()
            .save(root)
            .context("failed to write config.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
    } else {
        println!("  exists:  {}", paths::CONFIG_FILE);
    }

    let ledger = paths::ledger_path(root);
    let header = format!("{LEDGER_HEADER}\n");
    if io::write_if_missing(&ledger, header.as_bytes()).context("failed to write brag-list.md")? {
        println!("  created: {}", paths::LEDGER_FILE);
    } else {
        println!("  exists:  {}", paths::LEDGER_FILE);
    }

    println!("\nNext: record work with `brag task add`, then run `brag generate`.");
    Ok(())
}
