//! Writers: apply a codebase to a destination working tree and produce a
//! draft revision.
//!
//! ## `put_codebase` protocol
//!
//! 1. Check the codebase is in the writer's project space.
//! 2. For each file in the codebase, SHA-256 both sides; skip identical
//!    content with identical mode.
//! 3. Otherwise write `<path>.ferry.tmp`, copy the mode, rename over the
//!    destination.
//! 4. Delete destination files the codebase no longer has, except those
//!    matching the repository's ignore patterns.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use regex::Regex;
use sha2::{Digest, Sha256};

use ferry_core::{EvalError, Options, Problem, RevisionMetadata, WritingError};
use ferry_engine::{files, Codebase, Ui};

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

pub trait Writer {
    /// The working tree this writer updates.
    fn root(&self) -> &Path;

    fn put_codebase(
        &self,
        codebase: &Codebase,
        metadata: Option<&RevisionMetadata>,
    ) -> Result<DraftRevision, WritingError>;
}

pub trait WriterCreator {
    fn create(&self, options: &Options) -> Result<Box<dyn Writer>, EvalError>;
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Outcome of an individual file update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// Content or mode changed, or the file is new.
    Written { path: PathBuf },
    /// Destination already matched.
    Unchanged { path: PathBuf },
    /// Destination file had no counterpart in the codebase.
    Removed { path: PathBuf },
}

/// A codebase applied to a working tree, not yet committed anywhere.
#[derive(Debug, Clone)]
pub struct DraftRevision {
    pub location: PathBuf,
    pub metadata: Option<RevisionMetadata>,
    pub writes: Vec<WriteResult>,
}

impl DraftRevision {
    /// Writes and removals, ignoring unchanged files.
    pub fn changes(&self) -> usize {
        self.writes
            .iter()
            .filter(|w| !matches!(w, WriteResult::Unchanged { .. }))
            .count()
    }
}

/// Put `codebase` into `writer` as one progress task.
pub fn create_draft(
    ui: &dyn Ui,
    writer: &dyn Writer,
    codebase: &Codebase,
    metadata: Option<&RevisionMetadata>,
) -> Result<DraftRevision, Problem> {
    let task = ui.push_task("push_codebase", "Putting files from Codebase into Writer");
    let draft = writer
        .put_codebase(codebase, metadata)
        .map_err(|e| Problem::new(format!("Error creating draft revision to codebase: {e}")))?;
    ui.pop_task(task, &draft.location.display().to_string());
    Ok(draft)
}

// ---------------------------------------------------------------------------
// DirectoryWriter
// ---------------------------------------------------------------------------

/// Mirrors a codebase into a plain directory.
#[derive(Debug, Clone)]
pub struct DirectoryWriter {
    root: PathBuf,
    project_space: String,
    ignore: Vec<Regex>,
}

impl DirectoryWriter {
    pub fn new(root: impl Into<PathBuf>, project_space: impl Into<String>, ignore: Vec<Regex>) -> Self {
        Self {
            root: root.into(),
            project_space: project_space.into(),
            ignore,
        }
    }

    fn is_ignored(&self, relative: &str) -> bool {
        self.ignore.iter().any(|re| re.is_match(relative))
    }
}

impl Writer for DirectoryWriter {
    fn root(&self) -> &Path {
        &self.root
    }

    fn put_codebase(
        &self,
        codebase: &Codebase,
        metadata: Option<&RevisionMetadata>,
    ) -> Result<DraftRevision, WritingError> {
        codebase
            .check_project_space(&self.project_space)
            .map_err(|e| WritingError::Message(e.to_string()))?;

        let incoming = codebase.relative_files().map_err(problem)?;
        let existing: BTreeSet<String> = files::list_files(&self.root)
            .map_err(problem)?
            .into_iter()
            .filter(|name| !self.is_ignored(name))
            .collect();

        let mut writes = Vec::with_capacity(incoming.len());
        for name in &incoming {
            writes.push(sync_file(&codebase.file(name), &self.root.join(name))?);
        }
        for name in existing.difference(&incoming) {
            let path = self.root.join(name);
            std::fs::remove_file(&path).map_err(|e| write_err(&path, e))?;
            tracing::debug!(path = %path.display(), "removed");
            writes.push(WriteResult::Removed { path });
        }

        Ok(DraftRevision {
            location: self.root.clone(),
            metadata: metadata.cloned(),
            writes,
        })
    }
}

/// Bring `dest` in line with `src`, skipping the write when both already
/// hash the same and share a mode.
fn sync_file(src: &Path, dest: &Path) -> Result<WriteResult, WritingError> {
    let content = std::fs::read(src).map_err(|e| write_err(src, e))?;
    let digest = sha256(&content);

    if dest.is_file() {
        let current = std::fs::read(dest).map_err(|e| write_err(dest, e))?;
        if sha256(&current) == digest && files::is_executable(src) == files::is_executable(dest) {
            tracing::debug!(path = %dest.display(), "unchanged");
            return Ok(WriteResult::Unchanged {
                path: dest.to_path_buf(),
            });
        }
    }

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| write_err(parent, e))?;
    }
    let tmp = PathBuf::from(format!("{}.ferry.tmp", dest.display()));
    std::fs::write(&tmp, &content).map_err(|e| write_err(&tmp, e))?;
    let permissions = std::fs::metadata(src)
        .map_err(|e| write_err(src, e))?
        .permissions();
    std::fs::set_permissions(&tmp, permissions).map_err(|e| write_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, dest) {
        let _ = std::fs::remove_file(&tmp);
        return Err(write_err(dest, e));
    }

    tracing::debug!(path = %dest.display(), "wrote");
    Ok(WriteResult::Written {
        path: dest.to_path_buf(),
    })
}

fn sha256(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

fn write_err(path: &Path, source: std::io::Error) -> WritingError {
    WritingError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn problem(err: Problem) -> WritingError {
    WritingError::Message(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::Expression;
    use ferry_engine::testing::{read_tree, write_tree};
    use ferry_engine::RecordingUi;
    use tempfile::TempDir;

    fn codebase(dir: &TempDir, space: &str) -> Codebase {
        Codebase::at(dir.path(), space, Expression::repository("src"))
    }

    #[test]
    fn mirrors_codebase_and_reports_each_file() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        write_tree(src.path(), &[("same.txt", "s"), ("changed.txt", "new"), ("a/new.txt", "n")]);
        write_tree(dest.path(), &[("same.txt", "s"), ("changed.txt", "old"), ("gone.txt", "g")]);

        let writer = DirectoryWriter::new(dest.path(), "public", vec![]);
        let draft = writer.put_codebase(&codebase(&src, "public"), None).unwrap();

        assert_eq!(read_tree(dest.path()), read_tree(src.path()));
        assert_eq!(draft.changes(), 3);
        assert!(draft.writes.contains(&WriteResult::Unchanged {
            path: dest.path().join("same.txt")
        }));
        assert!(draft.writes.contains(&WriteResult::Removed {
            path: dest.path().join("gone.txt")
        }));
        assert!(!dest.path().join("changed.txt.ferry.tmp").exists());
    }

    #[test]
    fn ignored_destination_files_survive() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        write_tree(src.path(), &[("f.txt", "f")]);
        write_tree(dest.path(), &[("f.txt", "f"), (".git/HEAD", "ref")]);

        let writer = DirectoryWriter::new(dest.path(), "public", vec![Regex::new(r"^\.git/").unwrap()]);
        writer.put_codebase(&codebase(&src, "public"), None).unwrap();
        assert!(dest.path().join(".git/HEAD").exists());
    }

    #[test]
    fn wrong_project_space_is_a_writing_error() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let writer = DirectoryWriter::new(dest.path(), "public", vec![]);
        let err = writer
            .put_codebase(&codebase(&src, "internal"), None)
            .unwrap_err();
        assert!(err.to_string().contains("Expected project space \"public\""), "{err}");
    }

    #[cfg(unix)]
    #[test]
    fn mode_change_alone_is_written() {
        use std::os::unix::fs::PermissionsExt;
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        write_tree(src.path(), &[("run.sh", "echo")]);
        write_tree(dest.path(), &[("run.sh", "echo")]);
        std::fs::set_permissions(src.path().join("run.sh"), std::fs::Permissions::from_mode(0o755))
            .unwrap();

        let writer = DirectoryWriter::new(dest.path(), "public", vec![]);
        let draft = writer.put_codebase(&codebase(&src, "public"), None).unwrap();
        assert_eq!(draft.changes(), 1);
        assert!(files::is_executable(&dest.path().join("run.sh")));
    }

    #[test]
    fn draft_creation_is_a_task() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let ui = RecordingUi::new();
        let writer = DirectoryWriter::new(dest.path(), "public", vec![]);
        create_draft(&ui, &writer, &codebase(&src, "public"), None).unwrap();
        assert_eq!(ui.task_names(), vec!["push_codebase".to_string()]);

        let err = create_draft(&ui, &writer, &codebase(&src, "internal"), None).unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Error creating draft revision to codebase: "));
    }
}
