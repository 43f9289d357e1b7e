//! `ferry merge-codebases`: three-way merge into a fresh codebase.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use ferry_engine::CodebaseMerger;

use super::GlobalArgs;

#[derive(Args, Debug)]
pub struct MergeCodebasesArgs {
    /// Common ancestor.
    #[arg(long)]
    pub original: String,

    /// Carries the changes to apply.
    #[arg(long)]
    pub modified: String,

    /// Receives the changes.
    #[arg(long)]
    pub destination: String,
}

impl MergeCodebasesArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let project = global.project()?;
        let evaluate = |text: &str| -> Result<_> {
            let expression = super::parse_expression(text)?;
            project
                .evaluate(&expression)
                .with_context(|| format!("could not create codebase {expression}"))
        };
        let original = evaluate(&self.original)?;
        let modified = evaluate(&self.modified)?;
        let destination = evaluate(&self.destination)?;

        let result = CodebaseMerger::new(project.tools().clone())
            .merge(&original, &modified, &destination)?;
        let path = result.merged_codebase.persist();
        println!("{}", path.display());

        if !result.failed_files.is_empty() {
            for name in &result.failed_files {
                eprintln!("  {} {name}", "conflict".red().bold());
            }
            bail!("{} files have merge conflicts", result.failed_files.len());
        }
        Ok(())
    }
}
