use crate::output::print_json;
use anyhow::Context;
use brag_core::workflow::{accept_persisted, AcceptOutcome};
use std::path::Path;

pub fn run(root: &Path, index: usize, json: bool) -> anyhow::Result<()> {
    super::load_config(root)?;
    let outcome =
        accept_persisted(root, index).with_context(|| format!("failed to accept entry {index}"))?;
    if json {
        return print_json(&outcome);
    }
    report(&outcome);
    Ok(())
}

pub(crate) fn report(outcome: &AcceptOutcome) {
    if outcome.already_accepted {
        println!("Entry {} was already accepted: {}", outcome.index, outcome.title);
        return;
    }
    match &outcome.ledger_id {
        Some(id) => println!("Accepted [{}] {} (id {id})", outcome.index, outcome.title),
        None => println!("Accepted [{}] {}", outcome.index, outcome.title),
    }
    if let Some(err) = &outcome.batch_error {
        println!("warning: appended to the brag list but the batch was not updated: {err}");
    }
    for err in &outcome.task_errors {
        println!("warning: task write-back failed: {err}");
    }
}
