//! The `local` repository type: a directory of snapshots with a JSON
//! history.
//!
//! ```text
//! <url>/history.json        {"commits": [{"id", "author", "date", "description", "parents"}]}
//! <url>/revisions/<id>/     full tree at that revision
//! ```
//!
//! Commits are listed oldest first; the last one is the highest revision.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use ferry_core::error::io_err;
use ferry_core::{
    CodebaseCreationError, EvalError, Expression, Options, Problem, Revision, RevisionMetadata,
    WritingError,
};
use ferry_engine::creator::check_keys;
use ferry_engine::{files, Codebase, CodebaseCreator, Lifetime, ScratchDir, Toolbox};

use crate::history::RevisionHistory;
use crate::writer::{DirectoryWriter, DraftRevision, Writer, WriterCreator};

pub const LOCAL_REPOSITORY_TYPE: &str = "local";
pub const HISTORY_FILE: &str = "history.json";
pub const REVISIONS_DIR: &str = "revisions";
/// Written next to a writer's working tree by [`LocalWriter`].
pub const DRAFT_FILE: &str = "draft.json";

const REVISION_OPTION: &str = "revision";
const LOCALROOT_OPTION: &str = "localroot";

// ---------------------------------------------------------------------------
// On-disk history
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalCommit {
    pub id: String,
    #[serde(default)]
    pub author: Option<String>,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parents: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalHistoryFile {
    #[serde(default)]
    pub commits: Vec<LocalCommit>,
}

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

/// Shared state behind the history, creator and writer creator of one
/// `local` repository.
#[derive(Debug)]
pub struct LocalRepository {
    name: String,
    root: PathBuf,
    project_space: String,
    ignore: Vec<Regex>,
}

impl LocalRepository {
    pub fn new(
        name: impl Into<String>,
        root: impl Into<PathBuf>,
        project_space: impl Into<String>,
        ignore: Vec<Regex>,
    ) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            project_space: project_space.into(),
            ignore,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn load_history(&self) -> Result<LocalHistoryFile, Problem> {
        let path = self.root.join(HISTORY_FILE);
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        serde_json::from_str(&contents).map_err(|e| {
            Problem::new(format!("Could not parse history at {}: {e}", path.display()))
        })
    }

    pub fn revision_dir(&self, rev_id: &str) -> PathBuf {
        self.root.join(REVISIONS_DIR).join(rev_id)
    }

    fn is_ignored(&self, relative: &str) -> bool {
        self.ignore.iter().any(|re| re.is_match(relative))
    }

    fn commit(&self, rev_id: &str) -> Result<LocalCommit, Problem> {
        self.load_history()?
            .commits
            .into_iter()
            .find(|c| c.id == rev_id)
            .ok_or_else(|| {
                Problem::new(format!(
                    "Revision {rev_id} not found in repository {}",
                    self.name
                ))
            })
    }

    /// Resolve the `revision` option (head when absent) for a creator.
    fn requested_revision(&self, options: &Options) -> Result<Revision, EvalError> {
        let requested = options.get(REVISION_OPTION).map(String::as_str);
        let history = self.load_history()?;
        let found = match requested {
            Some(id) => history.commits.iter().find(|c| c.id == id),
            None => history.commits.last(),
        };
        match found {
            Some(commit) => Ok(Revision::new(&commit.id, &self.name)),
            None => Err(CodebaseCreationError::new(format!(
                "Repository {} has no revision {}",
                self.name,
                requested.unwrap_or("(head)")
            ))
            .into()),
        }
    }
}

impl RevisionHistory for LocalRepository {
    fn find_highest_revision(&self, rev_id: Option<&str>) -> Result<Revision, Problem> {
        let commit = match rev_id {
            Some(id) => self.commit(id)?,
            None => self
                .load_history()?
                .commits
                .pop()
                .ok_or_else(|| Problem::new(format!("Repository {} has no revisions", self.name)))?,
        };
        Ok(Revision::new(commit.id, &self.name))
    }

    fn raw_metadata(&self, revision: &Revision) -> Result<RevisionMetadata, Problem> {
        if revision.repository_name != self.name {
            return Err(Problem::new(format!(
                "Could not get metadata: Revision {revision} is not in repository {}",
                self.name
            )));
        }
        let commit = self.commit(&revision.rev_id)?;
        let parents = commit
            .parents
            .iter()
            .map(|p| Revision::new(p, &self.name))
            .collect();
        Ok(RevisionMetadata::new(
            commit.id,
            commit.author,
            commit.date,
            commit.description,
            parents,
        ))
    }

    fn find_head_revisions(&self) -> Result<Vec<Revision>, Problem> {
        let history = self.load_history()?;
        Ok(history
            .commits
            .iter()
            .filter(|c| !history.commits.iter().any(|o| o.parents.contains(&c.id)))
            .map(|c| Revision::new(&c.id, &self.name))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Codebase creator
// ---------------------------------------------------------------------------

pub struct LocalCodebaseCreator {
    repository: Rc<LocalRepository>,
    tools: Rc<Toolbox>,
}

impl LocalCodebaseCreator {
    pub fn new(repository: Rc<LocalRepository>, tools: Rc<Toolbox>) -> Self {
        Self { repository, tools }
    }
}

impl CodebaseCreator for LocalCodebaseCreator {
    fn create(&self, options: &Options) -> Result<Codebase, EvalError> {
        check_keys(options, &[REVISION_OPTION, LOCALROOT_OPTION])?;
        let repo = &self.repository;

        let (source, expression) = match options.get(LOCALROOT_OPTION) {
            Some(localroot) => {
                let path = PathBuf::from(localroot);
                if !path.is_dir() {
                    return Err(CodebaseCreationError::new(format!(
                        "localroot {localroot} is not a directory."
                    ))
                    .into());
                }
                let expr = Expression::repository(repo.name()).with_option(LOCALROOT_OPTION, localroot);
                (path, expr)
            }
            None => {
                let revision = repo.requested_revision(options)?;
                let expr = Expression::repository(repo.name()).at_revision(&revision.rev_id);
                (repo.revision_dir(&revision.rev_id), expr)
            }
        };

        let dir = self.tools.scratch.create("local_codebase_", Lifetime::Transient)?;
        files::copy_tree(&source, dir.path(), |name| !repo.is_ignored(name))?;
        tracing::debug!(repository = repo.name(), source = %source.display(), "created codebase");
        Ok(Codebase::new(dir, &repo.project_space, expression))
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Stored in [`DRAFT_FILE`] after each put.
#[derive(Debug, Serialize, Deserialize)]
pub struct DraftRecord {
    pub base_revision: String,
    pub metadata: Option<RevisionMetadata>,
}

/// A persistent checkout of one revision: `<scratch>/tree` is the working
/// tree and `<scratch>/draft.json` describes the pending commit.
pub struct LocalWriter {
    scratch: ScratchDir,
    base_revision: String,
    tree: DirectoryWriter,
}

impl LocalWriter {
    pub fn draft_file(&self) -> PathBuf {
        self.scratch.path().join(DRAFT_FILE)
    }
}

impl Writer for LocalWriter {
    fn root(&self) -> &Path {
        self.tree.root()
    }

    fn put_codebase(
        &self,
        codebase: &Codebase,
        metadata: Option<&RevisionMetadata>,
    ) -> Result<DraftRevision, WritingError> {
        let draft = self.tree.put_codebase(codebase, metadata)?;
        let record = DraftRecord {
            base_revision: self.base_revision.clone(),
            metadata: metadata.cloned(),
        };
        let json = serde_json::to_string_pretty(&record)
            .map_err(|e| WritingError::Message(format!("Could not serialize draft: {e}")))?;
        let path = self.draft_file();
        std::fs::write(&path, json).map_err(|source| WritingError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(draft)
    }
}

pub struct LocalWriterCreator {
    repository: Rc<LocalRepository>,
    tools: Rc<Toolbox>,
}

impl LocalWriterCreator {
    pub fn new(repository: Rc<LocalRepository>, tools: Rc<Toolbox>) -> Self {
        Self { repository, tools }
    }
}

impl WriterCreator for LocalWriterCreator {
    fn create(&self, options: &Options) -> Result<Box<dyn Writer>, EvalError> {
        check_keys(options, &[REVISION_OPTION])?;
        let repo = &self.repository;
        let revision = repo.requested_revision(options)?;

        let scratch = self.tools.scratch.create("local_writer_", Lifetime::Persistent)?;
        let tree = scratch.path().join("tree");
        files::copy_tree(&repo.revision_dir(&revision.rev_id), &tree, |_| true)?;
        tracing::info!(
            repository = repo.name(),
            revision = %revision.rev_id,
            path = %tree.display(),
            "opened writer"
        );

        Ok(Box::new(LocalWriter {
            scratch,
            base_revision: revision.rev_id,
            tree: DirectoryWriter::new(tree, &repo.project_space, repo.ignore.clone()),
        }))
    }
}

/// Write a `local` repository layout, mostly for fixtures and `init`-style
/// tooling.
pub fn write_history(root: &Path, history: &LocalHistoryFile) -> Result<(), Problem> {
    std::fs::create_dir_all(root).map_err(|e| io_err(root, e))?;
    let path = root.join(HISTORY_FILE);
    let json = serde_json::to_string_pretty(history)
        .map_err(|e| Problem::new(format!("Could not serialize history: {e}")))?;
    std::fs::write(&path, json).map_err(|e| io_err(&path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ferry_engine::testing::{read_tree, toolbox, write_tree, FnCommandRunner};
    use tempfile::TempDir;

    fn commit(id: &str, parents: &[&str]) -> LocalCommit {
        LocalCommit {
            id: id.into(),
            author: Some(format!("dev{id} <dev{id}@x.com>")),
            date: Utc.timestamp_opt(1_000 + id.len() as i64, 0).unwrap(),
            description: format!("commit {id}"),
            parents: parents.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn fixture() -> (TempDir, Rc<LocalRepository>) {
        let tmp = TempDir::new().unwrap();
        write_history(
            tmp.path(),
            &LocalHistoryFile {
                commits: vec![commit("1", &[]), commit("2", &["1"]), commit("3", &["2"])],
            },
        )
        .unwrap();
        write_tree(&tmp.path().join("revisions/1"), &[("a.txt", "one")]);
        write_tree(&tmp.path().join("revisions/3"), &[("a.txt", "three"), (".git/x", "")]);
        let repo = Rc::new(LocalRepository::new(
            "internal",
            tmp.path(),
            "internal",
            vec![Regex::new(r"^\.git/").unwrap()],
        ));
        (tmp, repo)
    }

    #[test]
    fn history_lookups() {
        let (_tmp, repo) = fixture();
        assert_eq!(
            repo.find_highest_revision(None).unwrap(),
            Revision::new("3", "internal")
        );
        assert_eq!(
            repo.find_highest_revision(Some("1")).unwrap(),
            Revision::new("1", "internal")
        );
        assert!(repo.find_highest_revision(Some("9")).is_err());
        assert_eq!(repo.find_head_revisions().unwrap(), vec![Revision::new("3", "internal")]);

        let md = repo.get_metadata(&Revision::new("2", "internal")).unwrap();
        assert_eq!(md.parents, vec![Revision::new("1", "internal")]);
        assert_eq!(md.author.as_deref(), Some("dev2 <dev2@x.com>"));
    }

    #[test]
    fn metadata_for_foreign_revision_fails() {
        let (_tmp, repo) = fixture();
        assert!(repo.raw_metadata(&Revision::new("1", "public")).is_err());
    }

    #[test]
    fn creator_snapshots_revision_without_ignored_files() {
        let (_tmp, repo) = fixture();
        let (tools, _) = toolbox(FnCommandRunner::never());
        let creator = LocalCodebaseCreator::new(repo, tools);

        let head = creator.create(&Options::new()).unwrap();
        assert_eq!(head.expression().to_string(), "internal(revision=3)");
        assert_eq!(read_tree(head.root()).keys().collect::<Vec<_>>(), vec!["a.txt"]);

        let mut options = Options::new();
        options.insert("revision".into(), "1".into());
        let first = creator.create(&options).unwrap();
        assert_eq!(read_tree(first.root())["a.txt"], "one");

        options.insert("revision".into(), "nope".into());
        assert!(!creator.create(&options).unwrap_err().is_fatal());

        let mut bad = Options::new();
        bad.insert("branch".into(), "x".into());
        assert!(creator
            .create(&bad)
            .unwrap_err()
            .to_string()
            .starts_with("Options contains invalid keys"));
    }

    #[test]
    fn writer_checks_out_and_records_draft() {
        let (_tmp, repo) = fixture();
        let scratch = TempDir::new().unwrap();
        let (tools, _) = toolbox(FnCommandRunner::never());
        let tools = Rc::new(Toolbox::new(
            tools.ui.clone(),
            tools.runner.clone(),
            ferry_engine::ScratchSpace::under(scratch.path()),
        ));
        let writer = LocalWriterCreator::new(repo, tools).create(&Options::new()).unwrap();
        assert_eq!(read_tree(writer.root())["a.txt"], "three");

        let src = TempDir::new().unwrap();
        write_tree(src.path(), &[("b.txt", "bee")]);
        let codebase = Codebase::at(src.path(), "internal", Expression::repository("x"));
        let md = RevisionMetadata::new("m", None, Utc.timestamp_opt(0, 0).unwrap(), "msg", vec![]);
        let draft = writer.put_codebase(&codebase, Some(&md)).unwrap();

        assert_eq!(read_tree(&draft.location).keys().collect::<Vec<_>>(), vec![".git/x", "b.txt"]);
        let record: DraftRecord = serde_json::from_str(
            &std::fs::read_to_string(draft.location.parent().unwrap().join(DRAFT_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(record.base_revision, "3");
        assert_eq!(record.metadata.unwrap().description, "msg");
    }
}
