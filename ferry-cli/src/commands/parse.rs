//! `ferry parse`: print the canonical form of an expression.

use anyhow::{Context, Result};
use clap::Args;

#[derive(Args, Debug)]
pub struct ParseArgs {
    pub expression: String,

    /// Require a bare repository term such as `internal(revision=3)`.
    #[arg(long)]
    pub repository: bool,
}

impl ParseArgs {
    pub fn run(self) -> Result<()> {
        let expression = if self.repository {
            ferry_core::expression::parse_repository_expression(&self.expression)
                .with_context(|| format!("invalid expression '{}'", self.expression))?
        } else {
            super::parse_expression(&self.expression)?
        };
        println!("{expression}");
        Ok(())
    }
}
