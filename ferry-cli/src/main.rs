//! ferry: keep independently versioned repositories in sync.
//!
//! # Usage
//!
//! ```text
//! ferry --config <file> check-config [--json]
//! ferry parse <expression> [--repository]
//! ferry --config <file> create-codebase <expression>
//! ferry --config <file> diff-codebases <expression> <expression>
//! ferry --config <file> merge-codebases --original <e> --modified <e> --destination <e>
//! ferry --config <file> highest-revision <repository> [--revision <id>] [--json]
//! ferry --config <file> find-equivalence <from> <to> [--revision <id>] [--json]
//! ferry --config <file> note-equivalence <expression> <expression>
//! ferry --config <file> determine-migrations [--migration <name>]... [--json]
//! ferry --config <file> bookkeep
//! ferry --config <file> migrate [--migration <name>]... [--skip-revision <r>]... [--skip-bookkeeping]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use commands::{
    bookkeep::BookkeepArgs, check_config::CheckConfigArgs, create::CreateCodebaseArgs,
    determine::DetermineMigrationsArgs, diff::DiffCodebasesArgs,
    equivalence::{FindEquivalenceArgs, NoteEquivalenceArgs},
    highest::HighestRevisionArgs, merge::MergeCodebasesArgs, migrate::MigrateArgs,
    parse::ParseArgs, GlobalArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "ferry",
    version,
    about = "Synchronize source changes between repositories in different project spaces",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load and validate a project configuration.
    CheckConfig(CheckConfigArgs),

    /// Parse an expression and print its canonical form.
    Parse(ParseArgs),

    /// Evaluate an expression and keep the resulting codebase on disk.
    CreateCodebase(CreateCodebaseArgs),

    /// Print a patch-style report of the differences between two codebases.
    DiffCodebases(DiffCodebasesArgs),

    /// Three-way merge: apply original -> modified onto destination.
    MergeCodebases(MergeCodebasesArgs),

    /// Show the newest revision of a repository.
    HighestRevision(HighestRevisionArgs),

    /// Walk a repository's history back to its last recorded equivalence.
    FindEquivalence(FindEquivalenceArgs),

    /// Record that two revisions hold equivalent code.
    NoteEquivalence(NoteEquivalenceArgs),

    /// List the migrations each configured migration would perform.
    DetermineMigrations(DetermineMigrationsArgs),

    /// Record equivalences and submitted migrations in the store.
    Bookkeep(BookkeepArgs),

    /// Bookkeep, then write draft revisions for pending migrations.
    Migrate(MigrateArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { "info" })
    });
    // stdout carries command output only.
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    let global = cli.global;
    match cli.command {
        Commands::CheckConfig(args) => args.run(&global),
        Commands::Parse(args) => args.run(),
        Commands::CreateCodebase(args) => args.run(&global),
        Commands::DiffCodebases(args) => args.run(&global),
        Commands::MergeCodebases(args) => args.run(&global),
        Commands::HighestRevision(args) => args.run(&global),
        Commands::FindEquivalence(args) => args.run(&global),
        Commands::NoteEquivalence(args) => args.run(&global),
        Commands::DetermineMigrations(args) => args.run(&global),
        Commands::Bookkeep(args) => args.run(&global),
        Commands::Migrate(args) => args.run(&global),
    }
}
