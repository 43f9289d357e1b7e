//! Materialised working trees.
//!
//! A [`Codebase`] is a directory plus the project space it is laid out for
//! and the expression that produced it. Codebases are read-only once built;
//! editors always write a fresh [`ScratchDir`].
//!
//! Scratch directories are transient by default and removed when the last
//! codebase referring to them is dropped, on success and failure alike.
//! [`Codebase::persist`] keeps one on disk past the end of the run.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use ferry_core::error::{io_err, Problem};
use ferry_core::Expression;
use tempfile::TempDir;

use crate::files;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// Deleted when dropped.
    Transient,
    /// Left on disk.
    Persistent,
}

// ---------------------------------------------------------------------------
// Scratch directories
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
    guard: RefCell<Option<TempDir>>,
}

impl ScratchDir {
    fn managed(dir: TempDir) -> Self {
        Self {
            path: dir.path().to_path_buf(),
            guard: RefCell::new(Some(dir)),
        }
    }

    /// A directory ferry does not own (an existing checkout, a user path).
    pub fn unmanaged(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: RefCell::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_transient(&self) -> bool {
        self.guard.borrow().is_some()
    }

    /// Stop cleaning this directory up.
    pub fn persist(&self) -> &Path {
        if let Some(dir) = self.guard.borrow_mut().take() {
            let _ = dir.keep();
        }
        &self.path
    }
}

/// Where scratch directories are allocated.
#[derive(Debug, Clone, Default)]
pub struct ScratchSpace {
    root: Option<PathBuf>,
}

impl ScratchSpace {
    /// Allocate under the system temp directory.
    pub fn system() -> Self {
        Self::default()
    }

    pub fn under(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    pub fn create(&self, prefix: &str, lifetime: Lifetime) -> Result<ScratchDir, Problem> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix);
        let dir = match &self.root {
            Some(root) => {
                std::fs::create_dir_all(root).map_err(|e| io_err(root, e))?;
                builder.tempdir_in(root).map_err(|e| io_err(root, e))?
            }
            None => builder
                .tempdir()
                .map_err(|e| io_err(std::env::temp_dir(), e))?,
        };
        let scratch = ScratchDir::managed(dir);
        if lifetime == Lifetime::Persistent {
            scratch.persist();
        }
        tracing::debug!(path = %scratch.path().display(), ?lifetime, "created scratch directory");
        Ok(scratch)
    }
}

// ---------------------------------------------------------------------------
// Codebase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Codebase {
    dir: Rc<ScratchDir>,
    project_space: String,
    expression: Expression,
}

impl Codebase {
    pub fn new(dir: ScratchDir, project_space: impl Into<String>, expression: Expression) -> Self {
        Self {
            dir: Rc::new(dir),
            project_space: project_space.into(),
            expression,
        }
    }

    /// A codebase over a directory ferry does not own.
    pub fn at(path: impl Into<PathBuf>, project_space: impl Into<String>, expression: Expression) -> Self {
        Self::new(ScratchDir::unmanaged(path), project_space, expression)
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn project_space(&self) -> &str {
        &self.project_space
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    /// Same tree, different generating expression.
    pub fn with_expression(&self, expression: Expression) -> Self {
        Self {
            dir: Rc::clone(&self.dir),
            project_space: self.project_space.clone(),
            expression,
        }
    }

    pub fn with_project_space(&self, project_space: impl Into<String>) -> Self {
        Self {
            dir: Rc::clone(&self.dir),
            project_space: project_space.into(),
            expression: self.expression.clone(),
        }
    }

    pub fn relative_files(&self) -> Result<BTreeSet<String>, Problem> {
        files::list_files(self.root())
    }

    /// Path of `relative` inside this codebase; the file may not exist.
    pub fn file(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    pub fn check_project_space(&self, project_space: &str) -> Result<(), Problem> {
        if self.project_space != project_space {
            return Err(Problem::new(format!(
                "Expected project space \"{project_space}\", but Codebase \"{self}\" is in project space \"{}\"",
                self.project_space
            )));
        }
        Ok(())
    }

    /// Keep the tree on disk after the run and return its location.
    pub fn persist(&self) -> &Path {
        self.dir.persist()
    }
}

impl fmt::Display for Codebase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_dir_removed_with_last_codebase() {
        let space = ScratchSpace::system();
        let dir = space.create("ferry_test_", Lifetime::Transient).unwrap();
        let path = dir.path().to_path_buf();
        let codebase = Codebase::new(dir, "public", Expression::repository("x"));
        let relabelled = codebase.with_project_space("internal");
        drop(codebase);
        assert!(path.exists(), "still referenced by the relabelled codebase");
        drop(relabelled);
        assert!(!path.exists());
    }

    #[test]
    fn persisted_dir_survives_drop() {
        let parent = TempDir::new().unwrap();
        let space = ScratchSpace::under(parent.path());
        let dir = space.create("ferry_test_", Lifetime::Transient).unwrap();
        let codebase = Codebase::new(dir, "public", Expression::repository("x"));
        let path = codebase.persist().to_path_buf();
        drop(codebase);
        assert!(path.exists());
    }

    #[test]
    fn project_space_mismatch_is_fatal() {
        let codebase = Codebase::at("/nowhere", "internal", Expression::repository("internal"));
        assert!(codebase.check_project_space("internal").is_ok());
        let err = codebase.check_project_space("public").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected project space \"public\", but Codebase \"internal\" is in project space \"internal\""
        );
    }
}
