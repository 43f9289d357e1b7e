//! `ferry create-codebase`: evaluate an expression and keep the tree.

use anyhow::{Context, Result};
use clap::Args;

use super::GlobalArgs;

#[derive(Args, Debug)]
pub struct CreateCodebaseArgs {
    /// e.g. `internal(revision=3)|scrub>public`
    pub expression: String,
}

impl CreateCodebaseArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let project = global.project()?;
        let expression = super::parse_expression(&self.expression)?;
        let codebase = project
            .evaluate(&expression)
            .with_context(|| format!("could not create codebase {expression}"))?;

        let path = codebase.persist();
        println!("Codebase \"{codebase}\" created at {}", path.display());
        Ok(())
    }
}
