use super::{
    accept::report,
    generate::{print_outcome, GenerateArgs},
    load_config,
    show::print_batch,
};
use anyhow::Context;
use brag_core::{
    generator::StatementGenerator,
    workflow::{EditDraft, GenerateRequest, ReviewPhase, ReviewSession},
};
use std::io::{BufRead, Write};
use std::path::Path;

const HELP: &str = "\
commands:
  list            show the batch
  accept <n>      append entry n to the brag list
  edit <n>        rewrite title, bullet, and metrics of entry n
  delete <n>      drop entry n from the batch
  generate        replace the batch with a fresh one
  quit            leave (also Ctrl-D)";

pub fn run(root: &Path, args: GenerateArgs) -> anyhow::Result<()> {
    if args.single.is_some() {
        anyhow::bail!("review works on a batch; use `brag generate --single` for one task");
    }
    let config = load_config(root)?;
    let request = args.request(&config)?;
    let generator = StatementGenerator::for_project(root, &config, args.offline)
        .context("failed to prepare generator")?;
    let mut session = ReviewSession::open(root, generator).context("failed to open review")?;
    let stdin = std::io::stdin();
    review_loop(&mut session, &request, &mut stdin.lock())
}

fn review_loop(
    session: &mut ReviewSession,
    request: &GenerateRequest,
    input: &mut impl BufRead,
) -> anyhow::Result<()> {
    if session.phase() == ReviewPhase::NoBatch {
        let outcome = session.generate(request).context("failed to generate batch")?;
        print_outcome(&outcome);
    } else if let Some(batch) = session.batch() {
        print_batch(batch);
    }
    println!("\n{HELP}");

    loop {
        let Some(line) = prompt(input, "\nbrag> ")? else {
            break;
        };
        let mut words = line.split_whitespace();
        let cmd = words.next().unwrap_or("");
        let index = words.next().map(str::parse::<usize>);

        let result: anyhow::Result<()> = match (cmd, index) {
            ("", _) => Ok(()),
            ("q" | "quit" | "exit", _) => break,
            ("h" | "help" | "?", _) => {
                println!("{HELP}");
                Ok(())
            }
            ("l" | "list", _) => {
                match session.batch() {
                    Some(b) => print_batch(b),
                    None => println!("No batch."),
                }
                Ok(())
            }
            ("g" | "generate", _) => session
                .generate(request)
                .map(|o| print_outcome(&o))
                .map_err(Into::into),
            ("a" | "accept", Some(Ok(n))) => session
                .accept(n)
                .map(|o| report(&o))
                .map_err(Into::into),
            ("d" | "delete", Some(Ok(n))) => session
                .delete(n)
                .map(|e| println!("Deleted [{n}] {}", e.title))
                .map_err(Into::into),
            ("e" | "edit", Some(Ok(n))) => edit(session, n, input),
            ("a" | "accept" | "d" | "delete" | "e" | "edit", _) => {
                println!("usage: {cmd} <n>");
                Ok(())
            }
            _ => {
                println!("unknown command '{cmd}'; type help");
                Ok(())
            }
        };
        if let Err(e) = result {
            println!("error: {e:#}");
        }
    }
    Ok(())
}

fn edit(session: &mut ReviewSession, index: usize, input: &mut impl BufRead) -> anyhow::Result<()> {
    let current = session.begin_edit(index)?.clone();
    println!("Editing [{index}]. Press Enter to keep a value.");
    let answers = match read_answers(input, &current) {
        Ok(a) => a,
        Err(e) => {
            session.cancel_edit();
            return Err(e);
        }
    };
    if let Some(draft) = session.draft_mut() {
        let (title, bullet, metrics) = answers;
        if let Some(t) = title {
            draft.title = t;
        }
        if let Some(b) = bullet {
            draft.bullet = b;
        }
        if let Some(m) = metrics {
            draft.metrics = m;
        }
    }
    match session.save_edit() {
        Ok(updated) => {
            println!("Saved [{index}] {}", updated.title);
            Ok(())
        }
        Err(e) => {
            session.cancel_edit();
            Err(e.into())
        }
    }
}

type Answers = (Option<String>, Option<String>, Option<String>);

fn read_answers(input: &mut impl BufRead, current: &EditDraft) -> anyhow::Result<Answers> {
    Ok((
        ask(input, "title", &current.title)?,
        ask(input, "bullet", &current.bullet)?,
        ask(input, "metrics", &current.metrics)?,
    ))
}

/// Ask for a replacement value; `None` keeps the current one.
fn ask(input: &mut impl BufRead, field: &str, current: &str) -> anyhow::Result<Option<String>> {
    println!("  {field}: {current}");
    let answer = prompt(input, &format!("  new {field}> "))?.unwrap_or_default();
    let answer = answer.trim();
    Ok((!answer.is_empty()).then(|| answer.to_string()))
}

/// Print `label` and read one line. `None` at end of input.
fn prompt(input: &mut impl BufRead, label: &str) -> anyhow::Result<Option<String>> {
    print!("{label}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}
