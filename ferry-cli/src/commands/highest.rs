//! `ferry highest-revision`: the newest revision of a repository.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use ferry_sync::RevisionHistory;

use super::GlobalArgs;

#[derive(Args, Debug)]
pub struct HighestRevisionArgs {
    pub repository: String,

    /// Resolve this revision instead of the newest.
    #[arg(long)]
    pub revision: Option<String>,

    /// Emit the revision metadata as JSON.
    #[arg(long)]
    pub json: bool,
}

impl HighestRevisionArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let project = global.project()?;
        let history = &project.repository(&self.repository)?.history;
        let revision = history.find_highest_revision(self.revision.as_deref())?;

        if self.json {
            let metadata = history.get_metadata(&revision)?;
            println!("{}", serde_json::to_string_pretty(&metadata)?);
            return Ok(());
        }

        println!(
            "Highest revision in repository \"{}\": {}",
            self.repository,
            revision.rev_id.bold()
        );
        Ok(())
    }
}
