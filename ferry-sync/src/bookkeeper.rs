//! Bookkeeping: bring the equivalence store up to date with what has
//! landed in each migration's destination repository.

use std::collections::HashSet;

use ferry_core::{
    Db, EvalError, Expression, Problem, RepositoryEquivalence, Revision, SubmittedMigration,
    MIGRATED_REV_KEY,
};
use ferry_engine::{Codebase, CodebaseDiffer};

use crate::history::{find_revisions, SearchType};
use crate::matcher::RepositoryEquivalenceMatcher;
use crate::project::Project;

pub struct Bookkeeper<'a> {
    project: &'a Project,
    differ: &'a CodebaseDiffer,
    db: &'a mut dyn Db,
}

impl<'a> Bookkeeper<'a> {
    pub fn new(project: &'a Project, differ: &'a CodebaseDiffer, db: &'a mut dyn Db) -> Self {
        Self {
            project,
            differ,
            db,
        }
    }

    /// Check every configured migration and write the store.
    pub fn bookkeep(&mut self) -> Result<(), Problem> {
        let ui = self.project.tools().ui.clone();
        let task = ui.push_task("bookkeeping", "Updating database");
        let mut tested_heads: HashSet<[Revision; 2]> = HashSet::new();
        let project = self.project;
        for migration in &project.config().migrations {
            self.bookkeep_migration(
                &mut tested_heads,
                &migration.name,
                &migration.from_repository,
                &migration.to_repository,
            )?;
        }
        ui.pop_task(task, "");
        self.db.write()
    }

    fn bookkeep_migration(
        &mut self,
        tested_heads: &mut HashSet<[Revision; 2]>,
        name: &str,
        from: &str,
        to: &str,
    ) -> Result<(), Problem> {
        let ui = self.project.tools().ui.clone();
        let task = ui.push_task(
            &format!("bookkeeping {name}"),
            &format!("Doing bookkeeping between '{from}' and '{to}' for migration '{name}'"),
        );
        let inverse = self
            .project
            .config()
            .find_translator_from(from, to)
            .ok_or_else(|| Problem::new(format!("Couldn't find a translator for {from} -> {to}")))?
            .inverse;

        let from_head = self.head(from)?;
        let to_head = self.head(to)?;
        let mut pair = [from_head.clone(), to_head.clone()];
        pair.sort();
        if tested_heads.insert(pair)
            && self
                .try_head_equivalence(&from_head, &to_head, inverse)?
                .is_some()
        {
            ui.pop_task(task, "");
            return Ok(());
        }
        self.note_completed_migrations(from, to, inverse)?;
        ui.pop_task(task, "");
        Ok(())
    }

    fn head(&self, repository: &str) -> Result<Revision, Problem> {
        let repo = self
            .project
            .repository(repository)
            .map_err(|e| Problem::new(e.to_string()))?;
        repo.history.find_highest_revision(None)
    }

    fn try_head_equivalence(
        &mut self,
        from: &Revision,
        to: &Revision,
        inverse: bool,
    ) -> Result<Option<RepositoryEquivalence>, Problem> {
        let ui = self.project.tools().ui.clone();
        let task = ui.push_task(
            "checking head equivalency",
            &format!("Checking head equivalence between '{from}' and '{to}'"),
        );
        let equivalence = if inverse {
            self.determine_equivalence(to, from)?
        } else {
            self.determine_equivalence(from, to)?
        };
        match &equivalence {
            Some(eq) => {
                ui.message(&format!("SUCCESS: Found Equivalence between {from} and {to}"));
                self.db.note_equivalence(eq.clone());
            }
            None => ui.message(&format!("No equivalence found between {from} and {to}")),
        }
        ui.pop_task(task, if equivalence.is_some() { "Found!!" } else { "Not Found." });
        Ok(equivalence)
    }

    /// Translate `from` into the project space of `to` and diff the two.
    pub fn determine_equivalence(
        &self,
        from: &Revision,
        to: &Revision,
    ) -> Result<Option<RepositoryEquivalence>, Problem> {
        let to_space = self
            .project
            .repository(&to.repository_name)
            .map_err(|e| Problem::new(e.to_string()))?
            .project_space
            .clone();
        let (Some(from_codebase), Some(to_codebase)) = (
            self.create_codebase_for_revision(from, Some(&to_space))?,
            self.create_codebase_for_revision(to, None)?,
        ) else {
            return Ok(None);
        };

        let ui = self.project.ui();
        let task = ui.push_task(
            "diff_codebases",
            &format!("Diff codebases '{from_codebase}' and '{to_codebase}'"),
        );
        let equivalent = !self
            .differ
            .diff_codebases(&from_codebase, &to_codebase)?
            .are_different();
        ui.pop_task(task, if equivalent { "No Difference" } else { "Difference Found" });

        if equivalent {
            Ok(Some(RepositoryEquivalence::new(from.clone(), to.clone())?))
        } else {
            Ok(None)
        }
    }

    fn create_codebase_for_revision(
        &self,
        revision: &Revision,
        translate_to: Option<&str>,
    ) -> Result<Option<Codebase>, Problem> {
        let mut expression =
            Expression::repository(&revision.repository_name).at_revision(&revision.rev_id);
        if let Some(space) = translate_to {
            let own_space = &self
                .project
                .repository(&revision.repository_name)
                .map_err(|e| Problem::new(e.to_string()))?
                .project_space;
            if own_space != space {
                expression = expression.translate_to(space);
            }
        }
        match self.project.evaluate(&expression) {
            Ok(codebase) => Ok(Some(codebase)),
            Err(EvalError::Creation(e)) => {
                self.project.ui().message(&format!(
                    "WARNING: Could not create codebase: {expression}: {e}"
                ));
                Ok(None)
            }
            Err(EvalError::Fatal(p)) => Err(p),
        }
    }

    /// Walk the destination history back to the last equivalence and
    /// record each migrated revision found on the way.
    fn note_completed_migrations(
        &mut self,
        from: &str,
        to: &str,
        inverse: bool,
    ) -> Result<(), Problem> {
        let project = self.project;
        let ui = project.tools().ui.clone();
        let task = ui.push_task(
            "check_migrations",
            &format!(
                "Checking completed migrations for new equivalence between '{from}' and '{to}'"
            ),
        );
        let to_history = project
            .repository(to)
            .map_err(|e| Problem::new(e.to_string()))?
            .history
            .clone();

        let found = {
            let matcher = RepositoryEquivalenceMatcher::new(from, &*self.db);
            find_revisions(to_history.as_ref(), None, &matcher, SearchType::Branched)?
        };
        let to_revisions = found.revisions_since_equivalence.breadth_first_history();
        ui.message(&format!(
            "Found {} revisions in {to} since equivalence ([{}])",
            to_revisions.len(),
            found
                .equivalences
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        ));

        let mut unmigrated = 0usize;
        let mut processed = 0usize;
        for to_revision in &to_revisions {
            let metadata = to_history.get_metadata(to_revision)?;
            match metadata.field(MIGRATED_REV_KEY) {
                Some(from_rev_id) => {
                    let migration = SubmittedMigration::new(
                        Revision::new(from_rev_id, from),
                        to_revision.clone(),
                    );
                    tracing::debug!(%migration, "processing submitted migration");
                    processed += 1;
                    if self.process_migration(migration, inverse)?.is_some() {
                        ui.message(
                            "Equivalence found - skipping remaining revisions in this migration.",
                        );
                        break;
                    }
                }
                None => {
                    unmigrated += 1;
                    processed += 1;
                    tracing::trace!(revision = %to_revision, "ignoring non-migrated revision");
                }
            }
        }
        ui.message(&format!("Ignored {unmigrated} commits that were not migrated"));
        if processed < to_revisions.len() {
            ui.message(&format!(
                "Skipped {} commits that preceded a discovered equivalence",
                to_revisions.len() - processed
            ));
        }
        ui.pop_task(task, "");
        Ok(())
    }

    fn process_migration(
        &mut self,
        migration: SubmittedMigration,
        inverse: bool,
    ) -> Result<Option<RepositoryEquivalence>, Problem> {
        let ui = self.project.tools().ui.clone();
        if self.db.has_migration(&migration) {
            ui.message(&format!(
                "Skipping: already recorded {} -> {}",
                migration.from_revision, migration.to_revision
            ));
            return Ok(None);
        }
        let task = ui.push_task(
            "process_migration",
            &format!("Bookkeeping migrated revision {migration}"),
        );
        let equivalence = if inverse {
            self.determine_equivalence(&migration.to_revision, &migration.from_revision)?
        } else {
            self.determine_equivalence(&migration.from_revision, &migration.to_revision)?
        };
        if let Some(eq) = &equivalence {
            self.db.note_equivalence(eq.clone());
            ui.message(&format!("SUCCESS: Equivalence found and recorded: {eq}"));
        }
        self.db.note_migration(migration);
        self.db.write()?;
        ui.pop_task(task, "");
        Ok(equivalence)
    }
}
