mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    config::ConfigSubcommand, entry::EntrySubcommand, generate::GenerateArgs,
    ledger::LedgerSubcommand, task::TaskSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "brag",
    about = "Turn completed tasks into reviewed achievement statements for your brag list",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .brag/ or .git/)
    #[arg(long, global = true, env = "BRAG_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .brag/ and a default config in the current project
    Init,

    /// Record and list completed tasks
    Task {
        #[command(subcommand)]
        subcommand: TaskSubcommand,
    },

    /// Generate a new batch of statements (or one statement with --single)
    Generate(GenerateArgs),

    /// Show the current generated batch
    Show,

    /// Edit or delete entries in the generated batch
    Entry {
        #[command(subcommand)]
        subcommand: EntrySubcommand,
    },

    /// Accept a generated entry into the brag list
    Accept {
        /// Position of the entry in the generated batch
        index: usize,
    },

    /// Inspect and prune the accepted brag list
    Ledger {
        #[command(subcommand)]
        subcommand: LedgerSubcommand,
    },

    /// Interactive review loop over the generated batch
    Review(GenerateArgs),

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Serve the JSON API
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "3142")]
        port: u16,
        /// Never call the model; always use template synthesis
        #[arg(long)]
        offline: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Task { subcommand } => cmd::task::run(&root, subcommand, cli.json),
        Commands::Generate(args) => cmd::generate::run(&root, args, cli.json),
        Commands::Show => cmd::show::run(&root, cli.json),
        Commands::Entry { subcommand } => cmd::entry::run(&root, subcommand, cli.json),
        Commands::Accept { index } => cmd::accept::run(&root, index, cli.json),
        Commands::Ledger { subcommand } => cmd::ledger::run(&root, subcommand, cli.json),
        Commands::Review(args) => cmd::review::run(&root, args),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
        Commands::Serve { port, offline } => cmd::serve::run(&root, port, offline),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
