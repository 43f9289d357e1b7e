//! `ferry check-config`: load and validate a project file.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::GlobalArgs;

#[derive(Args, Debug)]
pub struct CheckConfigArgs {
    /// Print the normalized configuration as JSON.
    #[arg(long)]
    pub json: bool,
}

impl CheckConfigArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let project = global.project()?;
        let config = project.config();

        if self.json {
            println!("{}", serde_json::to_string_pretty(config)?);
            return Ok(());
        }

        println!(
            "{} {} ({} repositories, {} editors, {} translators, {} migrations)",
            "✓".green().bold(),
            config.name.bold(),
            config.repositories.len(),
            config.editors.len(),
            config.translators.len(),
            config.migrations.len(),
        );
        Ok(())
    }
}
