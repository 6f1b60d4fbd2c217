use super::load_config;
use crate::output::print_json;
use brag_core::config::WarnLevel;
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the effective configuration
    Show,

    /// Validate the config for common mistakes
    Validate,
}

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(root, json),
        ConfigSubcommand::Validate => validate(root, json),
    }
}

fn show(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    if json {
        return print_json(&config);
    }
    let gen = &config.generation;
    println!("profile.seniority:          {}", config.profile.seniority);
    println!("profile.wording:            {}", config.profile.wording);
    println!("generation.backend:         {:?}", gen.backend);
    println!("generation.endpoint:        {}", gen.endpoint);
    println!("generation.model:           {}", gen.model);
    println!(
        "generation.timeout_secs:    {} (effective {})",
        gen.timeout_secs,
        gen.effective_timeout_secs()
    );
    println!("generation.temperature:     {}", gen.temperature);
    println!("generation.max_tokens:      {}", gen.max_tokens);
    println!("generation.single_max_tokens: {}", gen.single_max_tokens);
    Ok(())
}

fn validate(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let warnings = config.validate();
    let has_errors = warnings.iter().any(|w| w.level == WarnLevel::Error);

    if json {
        print_json(&serde_json::json!({ "warnings": warnings }))?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let label = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{label}] {}", w.message);
        }
    }

    if has_errors {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}
