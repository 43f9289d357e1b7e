//! `ferry find-equivalence` and `ferry note-equivalence`.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use ferry_core::expression::parse_repository_expression;
use ferry_core::{Db, Expression, RepositoryEquivalence, Revision};
use ferry_sync::{
    find_revisions, Project, RepositoryEquivalenceMatcher, RevisionHistory, SearchType,
};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use super::GlobalArgs;

// ---------------------------------------------------------------------------
// find-equivalence
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct FindEquivalenceArgs {
    /// Repository whose history is searched.
    pub from_repository: String,

    /// Repository the equivalences must point into.
    pub to_repository: String,

    /// Start from this revision instead of every head.
    #[arg(long)]
    pub revision: Option<String>,

    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct FindEquivalenceJson {
    equivalences: Vec<RepositoryEquivalence>,
    revisions_since_equivalence: Vec<Revision>,
}

#[derive(Tabled)]
struct EquivalenceRow {
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "To")]
    to: String,
}

impl FindEquivalenceArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let project = global.project()?;
        let db = global.open_db(&project)?;
        let history = &project.repository(&self.from_repository)?.history;

        let start = match &self.revision {
            Some(id) => Some(history.find_highest_revision(Some(id.as_str()))?),
            None => None,
        };
        let matcher = RepositoryEquivalenceMatcher::new(&self.to_repository, &db);
        let found = find_revisions(history.as_ref(), start.as_ref(), &matcher, SearchType::Branched)?;
        let pending = found.revisions_since_equivalence.breadth_first_history();

        if self.json {
            let report = FindEquivalenceJson {
                equivalences: found.equivalences,
                revisions_since_equivalence: pending,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        if found.equivalences.is_empty() {
            println!(
                "No equivalence found between {} and {}",
                self.from_repository, self.to_repository
            );
            return Ok(());
        }
        let rows: Vec<EquivalenceRow> = found
            .equivalences
            .iter()
            .map(|eq| EquivalenceRow {
                from: side(eq, &self.from_repository),
                to: side(eq, &self.to_repository),
            })
            .collect();
        println!("{}", Table::new(rows).with(Style::rounded()));
        println!("{} revisions since equivalence", pending.len());
        Ok(())
    }
}

fn side(eq: &RepositoryEquivalence, repository: &str) -> String {
    eq.revision_for_repository(repository)
        .map(ToString::to_string)
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// note-equivalence
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct NoteEquivalenceArgs {
    /// e.g. `internal(revision=3)`; the newest revision when none is given.
    pub revision1: String,

    /// e.g. `public(revision=p7)`
    pub revision2: String,
}

impl NoteEquivalenceArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let project = global.project()?;
        let mut db = global.open_db(&project)?;

        let rev1 = resolve_revision(&project, &self.revision1)?;
        let rev2 = resolve_revision(&project, &self.revision2)?;
        if rev1.repository_name == rev2.repository_name {
            bail!("both revisions are in repository {}", rev1.repository_name);
        }
        let equivalence = RepositoryEquivalence::new(rev1, rev2)?;

        db.note_equivalence(equivalence.clone());
        db.write()?;
        println!("{} Noted equivalence: {equivalence}", "✓".green().bold());
        Ok(())
    }
}

fn resolve_revision(project: &Project, text: &str) -> Result<Revision> {
    let expression = parse_repository_expression(text)
        .with_context(|| format!("invalid revision expression '{text}'"))?;
    let Expression::Repository(term) = &expression else {
        bail!("'{text}' is not a repository expression");
    };
    let history = &project.repository(term.identifier())?.history;
    Ok(history.find_highest_revision(term.option("revision"))?)
}
