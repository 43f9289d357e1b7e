//! Bookkeeping and the migrate run against `local` repositories on disk.

use std::path::Path;
use std::rc::Rc;

use chrono::{TimeZone, Utc};
use ferry_core::{Db, FileDb, ProjectConfig, RepositoryEquivalence, Revision, SubmittedMigration};
use ferry_engine::testing::{read_tree, write_tree, FnCommandRunner};
use ferry_engine::{CodebaseDiffer, DiffEngine, FileDiffer, RecordingUi, ScratchSpace, Toolbox};
use ferry_sync::local::{write_history, LocalCommit, LocalHistoryFile, DRAFT_FILE};
use ferry_sync::{migrate, Bookkeeper, MigrateOptions, Project};
use tempfile::TempDir;

fn commit(id: &str, parents: &[&str], description: &str) -> LocalCommit {
    LocalCommit {
        id: id.into(),
        author: Some(format!("{id} <{id}@example.com>")),
        date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        description: description.into(),
        parents: parents.iter().map(|p| p.to_string()).collect(),
    }
}

/// A commit and the full tree at that commit.
type Snapshot = (LocalCommit, Vec<(&'static str, &'static str)>);

/// `revisions` oldest first.
fn local_repo(root: &Path, revisions: &[Snapshot]) {
    write_history(
        root,
        &LocalHistoryFile {
            commits: revisions.iter().map(|(c, _)| c.clone()).collect(),
        },
    )
    .unwrap();
    for (commit, files) in revisions {
        let dir = root.join("revisions").join(&commit.id);
        std::fs::create_dir_all(&dir).unwrap();
        write_tree(&dir, files.as_slice());
    }
}

struct Fixture {
    tmp: TempDir,
    project: Project,
    ui: Rc<RecordingUi>,
    differ: CodebaseDiffer,
}

impl Fixture {
    fn db_path(&self) -> std::path::PathBuf {
        self.tmp.path().join("db.json")
    }

    fn db(&self) -> FileDb {
        FileDb::load(&self.db_path()).unwrap()
    }
}

fn fixture(separate: bool, public: Vec<Snapshot>) -> Fixture {
    let tmp = TempDir::new().unwrap();
    local_repo(
        &tmp.path().join("internal"),
        &[
            (commit("1", &[], "first"), vec![("java/a.txt", "one")]),
            (commit("2", &["1"], "second"), vec![("java/a.txt", "two")]),
            (
                commit("3", &["2"], "third"),
                vec![("java/a.txt", "three"), ("java/b.txt", "b")],
            ),
        ],
    );
    local_repo(&tmp.path().join("public"), &public);

    let json = format!(
        r#"{{
        "name": "demo",
        "repositories": {{
            "internal": {{"type": "local", "url": "{internal}", "project_space": "internal"}},
            "public": {{"type": "local", "url": "{public}"}}
        }},
        "editors": {{"renamer": {{"type": "renamer", "mappings": {{"java/": "src/"}}}}}},
        "translators": [
            {{"from_project_space": "internal", "to_project_space": "public",
              "steps": [{{"name": "rename", "editor": "renamer"}}]}}
        ],
        "migrations": [{{"name": "publish", "from_repository": "internal",
                         "to_repository": "public", "separate_revisions": {separate}}}]
    }}"#,
        internal = tmp.path().join("internal").display(),
        public = tmp.path().join("public").display(),
    );
    let ui = Rc::new(RecordingUi::new());
    let runner = FnCommandRunner::never();
    let tools = Rc::new(Toolbox::new(
        ui.clone(),
        runner.clone(),
        ScratchSpace::under(tmp.path().join("scratch")),
    ));
    let project = Project::new(ProjectConfig::from_json_str(&json).unwrap(), tools).unwrap();
    let differ = CodebaseDiffer::new(FileDiffer::new(runner, DiffEngine::Builtin));
    Fixture {
        tmp,
        project,
        ui,
        differ,
    }
}

fn seed(fx: &Fixture, pairs: &[((&str, &str), (&str, &str))]) {
    let mut db = fx.db();
    for (a, b) in pairs {
        db.note_equivalence(
            RepositoryEquivalence::new(Revision::new(a.0, a.1), Revision::new(b.0, b.1)).unwrap(),
        );
    }
    db.write().unwrap();
}

fn eq(a: (&str, &str), b: (&str, &str)) -> RepositoryEquivalence {
    RepositoryEquivalence::new(Revision::new(a.0, a.1), Revision::new(b.0, b.1)).unwrap()
}

// ---------------------------------------------------------------------------
// 1. Bookkeeping
// ---------------------------------------------------------------------------

#[test]
fn equivalent_heads_are_recorded() {
    let fx = fixture(
        false,
        vec![(
            commit("p1", &[], "import"),
            vec![("src/a.txt", "three"), ("src/b.txt", "b")],
        )],
    );
    let mut db = fx.db();
    Bookkeeper::new(&fx.project, &fx.differ, &mut db)
        .bookkeep()
        .unwrap();

    let reloaded = fx.db();
    assert!(reloaded
        .storage()
        .equivalences
        .contains(&eq(("3", "internal"), ("p1", "public"))));
    assert!(fx
        .ui
        .messages()
        .contains(&"SUCCESS: Found Equivalence between internal{3} and public{p1}".to_string()));
}

#[test]
fn submitted_migrations_are_found_in_destination_history() {
    let fx = fixture(
        false,
        vec![
            (commit("p1", &[], "import"), vec![("src/a.txt", "one")]),
            (
                commit("p2", &["p1"], "third\n\nCreated by ferry\nMOE_MIGRATED_REVID=3"),
                vec![("src/a.txt", "three"), ("src/b.txt", "b")],
            ),
            (
                commit("p3", &["p2"], "public-only edit"),
                vec![("src/a.txt", "three"), ("src/b.txt", "b"), ("README", "hi")],
            ),
        ],
    );
    seed(&fx, &[(("1", "internal"), ("p1", "public"))]);

    let mut db = fx.db();
    Bookkeeper::new(&fx.project, &fx.differ, &mut db)
        .bookkeep()
        .unwrap();

    let reloaded = fx.db();
    assert!(reloaded.has_migration(&SubmittedMigration::new(
        Revision::new("3", "internal"),
        Revision::new("p2", "public"),
    )));
    assert!(reloaded
        .storage()
        .equivalences
        .contains(&eq(("3", "internal"), ("p2", "public"))));
    let messages = fx.ui.messages();
    assert!(messages.contains(&"No equivalence found between internal{3} and public{p3}".to_string()));
    assert!(messages.contains(&"Ignored 1 commits that were not migrated".to_string()));
}

// ---------------------------------------------------------------------------
// 2. Migrate
// ---------------------------------------------------------------------------

fn public_at_one() -> Vec<Snapshot> {
    vec![(commit("p1", &[], "import"), vec![("src/a.txt", "one")])]
}

#[test]
fn migrate_writes_one_draft_with_all_pending_revisions() {
    let fx = fixture(false, public_at_one());
    seed(&fx, &[(("1", "internal"), ("p1", "public"))]);

    let mut db = fx.db();
    let outcomes = migrate(&fx.project, &mut db, &fx.differ, &MigrateOptions::default()).unwrap();

    assert_eq!(outcomes.len(), 1);
    let drafts = &outcomes[0].drafts;
    assert_eq!(drafts.len(), 1);
    let tree = read_tree(&drafts[0].location);
    assert_eq!(tree["src/a.txt"], "three");
    assert_eq!(tree["src/b.txt"], "b");

    let metadata = drafts[0].metadata.as_ref().unwrap();
    assert_eq!(metadata.id, "2, 3");
    assert!(metadata.description.ends_with("MOE_MIGRATED_REVID=3"));
    assert!(drafts[0].location.parent().unwrap().join(DRAFT_FILE).exists());
    assert!(fx
        .ui
        .messages()
        .last()
        .unwrap()
        .starts_with("Created Draft Revisions:\n"));
}

#[test]
fn separate_revisions_write_a_draft_each_and_honor_skips() {
    let fx = fixture(true, public_at_one());
    seed(&fx, &[(("1", "internal"), ("p1", "public"))]);

    let mut options = MigrateOptions {
        skip_bookkeeping: true,
        ..Default::default()
    };
    options.skip_revisions.insert("internal{2}".into());

    let mut db = fx.db();
    let outcomes = migrate(&fx.project, &mut db, &fx.differ, &options).unwrap();
    let drafts = &outcomes[0].drafts;
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].metadata.as_ref().unwrap().id, "3");
    assert!(fx
        .ui
        .messages()
        .iter()
        .any(|m| m.starts_with("Skipping 1/2 migration")));
}

#[test]
fn skipping_part_of_a_migration_is_fatal() {
    let fx = fixture(false, public_at_one());
    seed(&fx, &[(("1", "internal"), ("p1", "public"))]);

    let mut options = MigrateOptions {
        skip_bookkeeping: true,
        ..Default::default()
    };
    options.skip_revisions.insert("internal{2}".into());

    let mut db = fx.db();
    let err = migrate(&fx.project, &mut db, &fx.differ, &options).unwrap_err();
    assert!(err.is_fatal());
    assert!(err
        .to_string()
        .starts_with("Cannot skip subset of revisions in a single migration"));
}

#[test]
fn migrate_without_any_equivalence_is_fatal() {
    let fx = fixture(false, public_at_one());
    let mut db = fx.db();
    let err = migrate(&fx.project, &mut db, &fx.differ, &MigrateOptions::default()).unwrap_err();
    assert!(err.is_fatal());
    assert!(err.to_string().starts_with("Cannot migrate to an empty repository."));
}

#[test]
fn unknown_migration_names_are_skipped() {
    let fx = fixture(false, public_at_one());
    let options = MigrateOptions {
        skip_bookkeeping: true,
        migration_names: vec!["nope".into()],
        ..Default::default()
    };
    let mut db = fx.db();
    let outcomes = migrate(&fx.project, &mut db, &fx.differ, &options).unwrap();
    assert!(outcomes.is_empty());
    assert_eq!(
        fx.ui.messages(),
        vec![
            "No migration found with name nope... skipping.".to_string(),
            "No migrations made.".to_string()
        ]
    );
}
