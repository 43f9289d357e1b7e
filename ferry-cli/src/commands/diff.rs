//! `ferry diff-codebases`: patch-style report between two codebases.

use anyhow::{Context, Result};
use clap::Args;

use super::GlobalArgs;

#[derive(Args, Debug)]
pub struct DiffCodebasesArgs {
    pub codebase1: String,
    pub codebase2: String,
}

impl DiffCodebasesArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let project = global.project()?;
        let differ = global.differ(&project);

        let mut codebases = Vec::with_capacity(2);
        for text in [&self.codebase1, &self.codebase2] {
            let expression = super::parse_expression(text)?;
            let codebase = project
                .evaluate(&expression)
                .with_context(|| format!("could not create codebase {expression}"))?;
            codebases.push(codebase);
        }

        let difference = differ.diff_codebases(&codebases[0], &codebases[1])?;
        if difference.are_different() {
            print!("{}", difference.render_patch());
        } else {
            println!("No difference between {} and {}", codebases[0], codebases[1]);
        }
        Ok(())
    }
}
