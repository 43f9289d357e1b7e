//! `ferry determine-migrations`: plan without writing anything.

use anyhow::{Context, Result};
use clap::Args;
use ferry_sync::{Migration, Migrator};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use super::GlobalArgs;

#[derive(Args, Debug)]
pub struct DetermineMigrationsArgs {
    /// Only plan these migrations (repeatable); all when omitted.
    #[arg(long = "migration")]
    pub migrations: Vec<String>,

    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize, Tabled)]
struct MigrationRow {
    #[tabled(rename = "Migration")]
    name: String,
    #[tabled(rename = "From")]
    from_repository: String,
    #[tabled(rename = "To")]
    to_repository: String,
    #[tabled(rename = "Revisions")]
    revisions: String,
    #[tabled(rename = "Since equivalence")]
    since_equivalence: String,
}

impl From<&Migration> for MigrationRow {
    fn from(m: &Migration) -> Self {
        Self {
            name: m.name.clone(),
            from_repository: m.from_repository.clone(),
            to_repository: m.to_repository.clone(),
            revisions: m
                .from_revisions
                .iter()
                .map(|r| r.rev_id.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            since_equivalence: m.since_equivalence.to_string(),
        }
    }
}

impl DetermineMigrationsArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let project = global.project()?;
        let db = global.open_db(&project)?;
        let migrator = Migrator::new(project.tools().ui.clone());

        let configs: Vec<_> = if self.migrations.is_empty() {
            project.config().migrations.iter().collect()
        } else {
            self.migrations
                .iter()
                .map(|name| {
                    project
                        .migration(name)
                        .with_context(|| format!("no migration named '{name}'"))
                })
                .collect::<Result<_>>()?
        };

        let mut rows = Vec::new();
        for config in configs {
            let history = &project.repository(&config.from_repository)?.history;
            let planned = migrator
                .find_migrations_from_equivalency(history.as_ref(), config, &db)
                .with_context(|| format!("could not plan migration '{}'", config.name))?;
            rows.extend(planned.iter().map(MigrationRow::from));
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&rows)?);
            return Ok(());
        }
        if rows.is_empty() {
            println!("No pending migrations.");
            return Ok(());
        }
        println!("{}", Table::new(rows).with(Style::rounded()));
        Ok(())
    }
}
