pub mod bookkeep;
pub mod check_config;
pub mod create;
pub mod determine;
pub mod diff;
pub mod equivalence;
pub mod highest;
pub mod merge;
pub mod migrate;
pub mod parse;

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Args;
use ferry_core::{Expression, FileDb};
use ferry_engine::{CodebaseDiffer, DiffEngine, FileDiffer, Toolbox};
use ferry_sync::Project;

/// Options shared by every subcommand.
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Project configuration file (JSON, or YAML by extension).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Equivalence store; overrides the config's `database_uri`.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Compute content diffs in-process instead of running `diff`.
    #[arg(long, global = true)]
    pub builtin_diff: bool,
}

impl GlobalArgs {
    pub fn project(&self) -> Result<Project> {
        let path = self
            .config
            .as_ref()
            .context("this command needs a project: pass --config <file>")?;
        Project::load(path, Rc::new(Toolbox::system()))
            .with_context(|| format!("failed to load project from {}", path.display()))
    }

    /// `--db`, then the config's `database_uri`, then `~/.ferry/db.json`.
    pub fn db_path(&self, project: &Project) -> Result<PathBuf> {
        if let Some(path) = &self.db {
            return Ok(path.clone());
        }
        if let Some(uri) = &project.config().database_uri {
            return Ok(PathBuf::from(uri));
        }
        let home = dirs::home_dir().context("could not determine home directory")?;
        Ok(home.join(".ferry").join("db.json"))
    }

    pub fn open_db(&self, project: &Project) -> Result<FileDb> {
        let path = self.db_path(project)?;
        tracing::debug!(path = %path.display(), "opening equivalence store");
        FileDb::load(&path).with_context(|| format!("failed to open store {}", path.display()))
    }

    pub fn differ(&self, project: &Project) -> CodebaseDiffer {
        let engine = if self.builtin_diff {
            DiffEngine::Builtin
        } else {
            DiffEngine::External
        };
        CodebaseDiffer::new(FileDiffer::new(project.tools().runner.clone(), engine))
    }
}

pub fn parse_expression(text: &str) -> Result<Expression> {
    ferry_core::expression::parse_expression(text)
        .with_context(|| format!("invalid expression '{text}'"))
}
