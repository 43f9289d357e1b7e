//! `ferry bookkeep`: update the equivalence store.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use ferry_sync::Bookkeeper;

use super::GlobalArgs;

#[derive(Args, Debug)]
pub struct BookkeepArgs {}

impl BookkeepArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let project = global.project()?;
        let mut db = global.open_db(&project)?;
        let differ = global.differ(&project);

        Bookkeeper::new(&project, &differ, &mut db)
            .bookkeep()
            .context("bookkeeping failed")?;

        let storage = db.storage();
        println!(
            "{} Bookkeeping complete: {} equivalences, {} submitted migrations recorded",
            "✓".green().bold(),
            storage.equivalences.len(),
            storage.migrations.len()
        );
        Ok(())
    }
}
