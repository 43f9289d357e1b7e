//! Expression evaluation, translation pipelines and diff reports over real
//! directories, with external tools scripted.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use ferry_core::{EvalError, Expression, Options, ProjectConfig, Term};
use ferry_engine::testing::{self, FnCommandRunner};
use ferry_engine::{
    Codebase, CodebaseCreator, CodebaseDiffer, CommandRunner, DiffEngine, FileCodebaseCreator,
    FileDiffer, ProjectContext, Toolbox,
};
use tempfile::TempDir;

const PROJECT: &str = r#"{
    "name": "demo",
    "repositories": {
        "internal": {"type": "local", "project_space": "internal"},
        "public": {"type": "local"}
    },
    "editors": {
        "renamer": {"type": "renamer", "mappings": {"java/": "src/"}},
        "noop": {"type": "identity"}
    },
    "translators": [
        {"from_project_space": "internal", "to_project_space": "public",
         "steps": [{"name": "rename", "editor": "renamer"}]},
        {"from_project_space": "public", "to_project_space": "internal", "inverse": true}
    ]
}"#;

/// A repository served from a fixed directory.
struct DirCreator {
    inner: FileCodebaseCreator,
    path: PathBuf,
    project_space: String,
}

impl CodebaseCreator for DirCreator {
    fn create(&self, _options: &Options) -> Result<Codebase, EvalError> {
        let mut options = Options::new();
        options.insert("path".into(), self.path.display().to_string());
        options.insert("projectspace".into(), self.project_space.clone());
        self.inner.create(&options)
    }
}

fn context(
    json: &str,
    runner: Rc<dyn CommandRunner>,
    repos: &[(&str, &Path, &str)],
) -> (ProjectContext, Rc<ferry_engine::RecordingUi>) {
    let (tools, ui) = testing::toolbox(runner);
    let mut creators: BTreeMap<String, Rc<dyn CodebaseCreator>> = BTreeMap::new();
    for (name, path, space) in repos {
        creators.insert(
            name.to_string(),
            Rc::new(DirCreator {
                inner: FileCodebaseCreator::new(Rc::clone(&tools)),
                path: path.to_path_buf(),
                project_space: space.to_string(),
            }),
        );
    }
    let config = ProjectConfig::from_json_str(json).unwrap();
    (ProjectContext::new(config, tools, creators).unwrap(), ui)
}

fn file_expr(path: &Path, space: &str) -> Expression {
    Expression::Repository(
        Term::new("file")
            .with_option("path", path.display().to_string())
            .with_option("projectspace", space),
    )
}

// ---------------------------------------------------------------------------
// 1. Forward evaluation
// ---------------------------------------------------------------------------

#[test]
fn repository_edit_translate() {
    let internal = TempDir::new().unwrap();
    testing::write_tree(internal.path(), &[("java/A.java", "class A {}")]);
    let (ctx, ui) = context(
        PROJECT,
        FnCommandRunner::never(),
        &[("internal", internal.path(), "internal")],
    );

    let expr = Expression::repository("internal")
        .edit_with("noop", Options::new())
        .translate_to("public");
    let codebase = ctx.evaluate(&expr).unwrap();

    assert_eq!(codebase.project_space(), "public");
    assert_eq!(codebase.expression(), &expr);
    assert_eq!(codebase.to_string(), "internal|noop>public");
    assert_eq!(
        testing::read_tree(codebase.root())["src/A.java"],
        "class A {}"
    );
    assert_eq!(
        ui.task_names(),
        vec!["create_codebase", "edit", "translate", "edit"]
    );
}

#[test]
fn unknown_names_are_recoverable() {
    let (ctx, _ui) = context(PROJECT, FnCommandRunner::never(), &[]);

    let err = ctx.evaluate(&Expression::repository("nowhere")).unwrap_err();
    assert!(!err.is_fatal());
    assert_eq!(
        err.to_string(),
        "No such repository 'nowhere' in the config. Found: []"
    );

    let dir = TempDir::new().unwrap();
    let err = ctx
        .evaluate(&file_expr(dir.path(), "internal").edit_with("missing", Options::new()))
        .unwrap_err();
    assert_eq!(err.to_string(), "no editor missing");

    let err = ctx
        .evaluate(&file_expr(dir.path(), "internal").translate_to("mars"))
        .unwrap_err();
    assert!(!err.is_fatal());
    assert!(err
        .to_string()
        .starts_with("Could not find translator from project space \"internal\" to \"mars\"."));
    assert!(err.to_string().contains("[internal>public, public>internal]"));
}

#[test]
fn uncovered_rename_is_fatal() {
    let internal = TempDir::new().unwrap();
    testing::write_tree(internal.path(), &[("README", "hi")]);
    let (ctx, _ui) = context(PROJECT, FnCommandRunner::never(), &[]);
    let err = ctx
        .evaluate(&file_expr(internal.path(), "internal").translate_to("public"))
        .unwrap_err();
    assert!(err.is_fatal());
}

// ---------------------------------------------------------------------------
// 2. Inverse translation
// ---------------------------------------------------------------------------

#[test]
fn inverse_translation_through_renamer() {
    let internal = TempDir::new().unwrap();
    testing::write_tree(
        internal.path(),
        &[("java/A.java", "old"), ("java/util/U.java", "u")],
    );
    let public = TempDir::new().unwrap();
    testing::write_tree(
        public.path(),
        &[("src/A.java", "new"), ("src/util/U.java", "u"), ("src/util/V.java", "v")],
    );
    let (ctx, ui) = context(PROJECT, FnCommandRunner::never(), &[]);

    let expr = file_expr(public.path(), "public")
        .translate_to("internal")
        .with_reference_target_codebase(&file_expr(internal.path(), "internal"));
    let codebase = ctx.evaluate(&expr).unwrap();

    assert_eq!(codebase.project_space(), "internal");
    let tree = testing::read_tree(codebase.root());
    assert_eq!(tree["java/A.java"], "new");
    assert_eq!(tree["java/util/V.java"], "v");
    assert_eq!(tree.len(), 3);
    assert!(ui.task_names().contains(&"inverseEdit".to_string()));
    assert!(ui.task_names().contains(&"refTo".to_string()));
}

const IDENTITY_PROJECT: &str = r#"{
    "name": "demo",
    "repositories": {"internal": {"type": "local", "project_space": "internal"}},
    "translators": [
        {"from_project_space": "internal", "to_project_space": "public",
         "steps": [{"name": "id", "editor": {"type": "identity"}}]},
        {"from_project_space": "public", "to_project_space": "internal", "inverse": true}
    ]
}"#;

#[test]
fn inverse_translation_merges_onto_reference() {
    let internal = TempDir::new().unwrap();
    testing::write_tree(internal.path(), &[("f", "A"), ("g", "G"), ("gone", "x")]);
    let public = TempDir::new().unwrap();
    testing::write_tree(public.path(), &[("f", "B"), ("g", "G"), ("h", "H")]);
    let runner = FnCommandRunner::taking_modified();
    let (ctx, _ui) = context(IDENTITY_PROJECT, runner.clone(), &[]);

    let expr = file_expr(public.path(), "public")
        .translate_to("internal")
        .with_reference_target_codebase(&file_expr(internal.path(), "internal"));
    let codebase = ctx.evaluate(&expr).unwrap();

    let tree = testing::read_tree(codebase.root());
    assert_eq!(tree["f"], "B");
    assert_eq!(tree["g"], "G");
    assert_eq!(tree["h"], "H");
    assert!(!tree.contains_key("gone"), "deleted upstream and untouched here");
    assert!(runner.calls().iter().all(|c| c.starts_with("merge ")));
}

#[test]
fn inverse_translation_requires_reference_target() {
    let public = TempDir::new().unwrap();
    let (ctx, _ui) = context(IDENTITY_PROJECT, FnCommandRunner::never(), &[]);
    let err = ctx
        .evaluate(&file_expr(public.path(), "public").translate_to("internal"))
        .unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(
        err.to_string(),
        "Inverse translation requires key 'referenceTargetCodebase'."
    );
}

#[test]
fn unparsable_reference_target_is_recoverable() {
    let public = TempDir::new().unwrap();
    let (ctx, _ui) = context(IDENTITY_PROJECT, FnCommandRunner::never(), &[]);
    let expr = file_expr(public.path(), "public")
        .translate_to("internal")
        .with_option("referenceTargetCodebase", "internal(");
    let err = ctx.evaluate(&expr).unwrap_err();
    assert!(!err.is_fatal());
    assert!(err.to_string().starts_with("Couldn't parse in translation: Cannot parse:"));
}

// ---------------------------------------------------------------------------
// 3. Eager registry validation
// ---------------------------------------------------------------------------

#[test]
fn inverse_without_forward_rejected_at_load() {
    let json = r#"{"name": "x", "repositories": {"a": {"type": "local"}},
                   "translators": [{"from_project_space": "public",
                                    "to_project_space": "internal", "inverse": true}]}"#;
    let config = ProjectConfig::from_json_str(json).unwrap();
    let tools = Rc::new(Toolbox::system());
    let err = ProjectContext::new(config, tools, BTreeMap::new())
        .err()
        .unwrap();
    assert!(err.to_string().contains("has no forward translator"), "got: {err}");
}

#[test]
fn bad_editor_configs_rejected_at_load() {
    for json in [
        r#"{"name": "x", "repositories": {"a": {"type": "local"}},
            "editors": {"sh": {"type": "shell"}}}"#,
        r#"{"name": "x", "repositories": {"a": {"type": "local"}},
            "editors": {"r": {"type": "renamer", "regex": true, "mappings": {"(": "x"}}}}"#,
    ] {
        let config = ProjectConfig::from_json_str(json).unwrap();
        let result = ProjectContext::new(config, Rc::new(Toolbox::system()), BTreeMap::new());
        assert!(result.is_err());
    }
}

// ---------------------------------------------------------------------------
// 4. Codebase diffs
// ---------------------------------------------------------------------------

#[test]
fn codebase_diff_report() {
    let one = TempDir::new().unwrap();
    testing::write_tree(one.path(), &[("same", "s\n"), ("changed", "a\n"), ("only1", "x\n")]);
    let two = TempDir::new().unwrap();
    testing::write_tree(two.path(), &[("same", "s\n"), ("changed", "b\n")]);
    let c1 = Codebase::at(one.path(), "public", Expression::repository("c1"));
    let c2 = Codebase::at(two.path(), "public", Expression::repository("c2"));

    let differ = CodebaseDiffer::new(FileDiffer::new(FnCommandRunner::never(), DiffEngine::Builtin));
    let difference = differ.diff_codebases(&c1, &c2).unwrap();
    assert!(difference.are_different());
    let names: Vec<_> = difference
        .file_diffs
        .iter()
        .map(|d| d.relative_filename.as_str())
        .collect();
    assert_eq!(names, vec!["changed", "only1"]);

    let patch = difference.render_patch();
    assert!(patch.starts_with("diff c1 c2\ndiff --moe c1/changed c2/changed\n<<< c1/changed\n>>> c2/changed\n"));
    assert!(patch.contains("-a\n+b\n"), "got: {patch}");

    let identical = differ.diff_codebases(&c1, &c1).unwrap();
    assert!(!identical.are_different());
}
