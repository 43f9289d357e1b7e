//! `ferry migrate`: bookkeep, then write a draft revision per migration.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use ferry_sync::{pipeline, MigrateOptions, MigrationOutcome};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use super::GlobalArgs;

#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Only run these migrations (repeatable); all when omitted.
    #[arg(long = "migration")]
    pub migrations: Vec<String>,

    /// Leave out a revision, written `repository{id}` (repeatable).
    #[arg(long = "skip-revision")]
    pub skip_revisions: Vec<String>,

    /// Trust the store as it is.
    #[arg(long)]
    pub skip_bookkeeping: bool,

    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize, Tabled)]
struct DraftRow {
    #[tabled(rename = "Migration")]
    migration: String,
    #[tabled(rename = "To")]
    to_repository: String,
    #[tabled(rename = "Draft")]
    location: String,
    #[tabled(rename = "Changed files")]
    changes: usize,
}

fn rows(outcomes: &[MigrationOutcome]) -> Vec<DraftRow> {
    outcomes
        .iter()
        .flat_map(|outcome| {
            outcome.drafts.iter().map(move |draft| DraftRow {
                migration: outcome.migration.clone(),
                to_repository: outcome.to_repository.clone(),
                location: draft.location.display().to_string(),
                changes: draft.changes(),
            })
        })
        .collect()
}

impl MigrateArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let project = global.project()?;
        let mut db = global.open_db(&project)?;
        let differ = global.differ(&project);

        let options = MigrateOptions {
            skip_bookkeeping: self.skip_bookkeeping,
            skip_revisions: self.skip_revisions.into_iter().collect(),
            migration_names: self.migrations,
        };
        let outcomes =
            pipeline::migrate(&project, &mut db, &differ, &options).context("migrate failed")?;
        let rows = rows(&outcomes);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&rows)?);
            return Ok(());
        }
        if rows.is_empty() {
            println!("{}", "No migrations made.".yellow());
            return Ok(());
        }
        println!("{}", Table::new(rows).with(Style::rounded()));
        Ok(())
    }
}
