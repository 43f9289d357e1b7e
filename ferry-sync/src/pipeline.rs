//! The end-to-end migrate run: bookkeep, plan, translate, write drafts.

use std::collections::BTreeSet;

use ferry_core::{Db, EvalError, Expression, Options, Problem};
use ferry_engine::CodebaseDiffer;

use crate::bookkeeper::Bookkeeper;
use crate::error::SyncError;
use crate::migrator::Migrator;
use crate::project::Project;
use crate::writer::DraftRevision;

#[derive(Debug, Clone, Default)]
pub struct MigrateOptions {
    pub skip_bookkeeping: bool,
    /// Revisions to leave out, written as `repository{id}`.
    pub skip_revisions: BTreeSet<String>,
    /// Migrations to run; every configured migration when empty.
    pub migration_names: Vec<String>,
}

/// The drafts one configured migration produced.
#[derive(Debug, Clone)]
pub struct MigrationOutcome {
    pub migration: String,
    pub to_repository: String,
    pub drafts: Vec<DraftRevision>,
}

/// Run every requested migration and return the drafts written.
pub fn migrate(
    project: &Project,
    db: &mut dyn Db,
    differ: &CodebaseDiffer,
    options: &MigrateOptions,
) -> Result<Vec<MigrationOutcome>, SyncError> {
    let ui = project.tools().ui.clone();
    let names: Vec<String> = if options.migration_names.is_empty() {
        project.config().migrations.iter().map(|m| m.name.clone()).collect()
    } else {
        options.migration_names.clone()
    };

    if !options.skip_bookkeeping {
        Bookkeeper::new(project, differ, &mut *db).bookkeep()?;
    }

    let migrator = Migrator::new(ui.clone());
    let mut outcomes = Vec::new();
    for name in &names {
        let task = ui.push_task("perform_migration", &format!("Performing migration '{name}'"));
        let Some(config) = project.migration(name) else {
            ui.message(&format!("No migration found with name {name}... skipping."));
            ui.pop_task(task, "");
            continue;
        };

        let from_repository = project.repository(&config.from_repository)?;
        let to_repository = project.repository(&config.to_repository)?;
        let migrations = migrator.find_migrations_from_equivalency(
            from_repository.history.as_ref(),
            config,
            &*db,
        )?;
        if migrations.is_empty() {
            ui.message(&format!("No pending revisions to migrate for {name}"));
            ui.pop_task(task, "");
            continue;
        }

        let mut writer_options = Options::new();
        let mut target = Expression::repository(&config.to_repository);
        if let Some(rev) = migrations[0]
            .since_equivalence
            .revision_for_repository(&config.to_repository)
        {
            writer_options.insert("revision".to_string(), rev.rev_id.clone());
            target = target.at_revision(&rev.rev_id);
        }
        let writer = to_repository
            .writer_creator
            .create(&writer_options)
            .map_err(|e| Problem::new(format!("Couldn't create local repo {target}: {e}")))?;

        let reference_target = Expression::repository(&config.to_repository)
            .with_option("localroot", writer.root().display().to_string());
        let total = migrations.len();
        let mut drafts = Vec::new();
        for (index, migration) in migrations.iter().enumerate() {
            let position = index + 1;
            let skipped = migration
                .from_revisions
                .iter()
                .filter(|r| options.skip_revisions.contains(&r.to_string()))
                .count();
            if skipped > 0 {
                if skipped != migration.from_revisions.len() {
                    return Err(Problem::new(format!(
                        "Cannot skip subset of revisions in a single migration: {migration}"
                    ))
                    .into());
                }
                ui.message(&format!("Skipping {position}/{total} migration `{migration}`"));
                continue;
            }

            let one = ui.push_task(
                "perform_individual_migration",
                &format!("Performing {position}/{total} migration '{migration}'"),
            );
            let most_recent = migration
                .most_recent()
                .ok_or_else(|| Problem::new(format!("Migration {migration} has no revisions")))?;
            let from_expression = Expression::repository(&migration.from_repository)
                .at_revision(&most_recent.rev_id)
                .translate_to(&to_repository.project_space)
                .with_reference_target_codebase(&reference_target);
            let from_codebase = project.evaluate(&from_expression).map_err(|e| match e {
                EvalError::Creation(e) => Problem::new(e.to_string()),
                EvalError::Fatal(p) => p,
            })?;

            let draft = migrator.migrate(
                migration,
                from_repository.history.as_ref(),
                &from_codebase,
                config.metadata_scrubber_config.as_ref(),
                writer.as_ref(),
            )?;
            ui.pop_task(one, &draft.location.display().to_string());
            drafts.push(draft);
        }

        ui.pop_task(task, "");
        outcomes.push(MigrationOutcome {
            migration: name.clone(),
            to_repository: config.to_repository.clone(),
            drafts,
        });
    }

    let made: Vec<String> = outcomes
        .iter()
        .filter_map(|o| {
            o.drafts
                .last()
                .map(|d| format!("{} in repository {}", d.location.display(), o.to_repository))
        })
        .collect();
    if made.is_empty() {
        ui.message("No migrations made.");
    } else {
        ui.message(&format!("Created Draft Revisions:\n{}", made.join("\n")));
    }
    Ok(outcomes)
}
