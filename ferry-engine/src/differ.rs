//! File and codebase differences.
//!
//! [`FileDiffer`] compares one file pair; [`CodebaseDiffer`] compares the
//! union of files in two codebases and keeps the pairs that differ.
//! [`CodebaseDifference::render_patch`] produces the textual report.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use ferry_core::error::{io_err, Problem};
use similar::TextDiff;

use crate::codebase::Codebase;
use crate::command::CommandRunner;
use crate::files;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Same,
    Only1,
    Only2,
}

impl Comparison {
    pub fn diff_bools(b1: bool, b2: bool) -> Self {
        if b1 == b2 {
            Comparison::Same
        } else if b1 {
            Comparison::Only1
        } else {
            Comparison::Only2
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDifference {
    pub relative_filename: String,
    pub file1: PathBuf,
    pub file2: PathBuf,
    pub existence: Comparison,
    pub executability: Comparison,
    /// Line diff output; `None` when contents match.
    pub content_diff: Option<String>,
}

impl FileDifference {
    pub fn is_different(&self) -> bool {
        self.existence != Comparison::Same
            || self.executability != Comparison::Same
            || self.content_diff.is_some()
    }
}

/// How content diffs are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiffEngine {
    /// `diff -N -u` through the command runner.
    #[default]
    External,
    /// In-process unified diff.
    Builtin,
}

// ---------------------------------------------------------------------------
// FileDiffer
// ---------------------------------------------------------------------------

pub struct FileDiffer {
    runner: Rc<dyn CommandRunner>,
    engine: DiffEngine,
}

impl FileDiffer {
    pub fn new(runner: Rc<dyn CommandRunner>, engine: DiffEngine) -> Self {
        Self { runner, engine }
    }

    pub fn diff_files(
        &self,
        relative_filename: &str,
        file1: &Path,
        file2: &Path,
    ) -> Result<FileDifference, Problem> {
        let exists1 = file1.exists();
        let exists2 = file2.exists();
        if !exists1 && !exists2 {
            return Err(Problem::new(format!(
                "Neither file exists: {}, {}",
                file1.display(),
                file2.display()
            )));
        }
        let executable1 = exists1 && files::is_executable(file1);
        let executable2 = exists2 && files::is_executable(file2);

        let content_diff = match self.engine {
            DiffEngine::External => self.external_diff(file1, file2)?,
            DiffEngine::Builtin => builtin_diff(file1, file2)?,
        };

        Ok(FileDifference {
            relative_filename: relative_filename.to_string(),
            file1: file1.to_path_buf(),
            file2: file2.to_path_buf(),
            existence: Comparison::diff_bools(exists1, exists2),
            executability: Comparison::diff_bools(executable1, executable2),
            content_diff,
        })
    }

    fn external_diff(&self, file1: &Path, file2: &Path) -> Result<Option<String>, Problem> {
        let a = file1.to_string_lossy();
        let b = file2.to_string_lossy();
        let output = self
            .runner
            .run("diff", &["-N", "-u", a.as_ref(), b.as_ref()], Path::new("."))?;
        match output.status {
            0 => Ok(None),
            1 | 2 => Ok(Some(output.stdout)),
            other => Err(Problem::new(format!("diff returned unknown status: {other}"))),
        }
    }
}

/// Missing files read as empty, like `diff -N`.
fn builtin_diff(file1: &Path, file2: &Path) -> Result<Option<String>, Problem> {
    let left = read_or_empty(file1)?;
    let right = read_or_empty(file2)?;
    if left == right {
        return Ok(None);
    }
    let (Some(left), Some(right)) = (as_text(&left), as_text(&right)) else {
        return Ok(Some(format!(
            "Binary files {} and {} differ",
            file1.display(),
            file2.display()
        )));
    };
    let a = file1.display().to_string();
    let b = file2.display().to_string();
    let unified = TextDiff::from_lines(left, right)
        .unified_diff()
        .header(&a, &b)
        .context_radius(3)
        .to_string();
    Ok(Some(unified))
}

fn read_or_empty(path: &Path) -> Result<Vec<u8>, Problem> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(err) => Err(io_err(path, err)),
    }
}

fn as_text(bytes: &[u8]) -> Option<&str> {
    if bytes.contains(&0) {
        return None;
    }
    std::str::from_utf8(bytes).ok()
}

// ---------------------------------------------------------------------------
// CodebaseDiffer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CodebaseDifference {
    pub codebase1: Codebase,
    pub codebase2: Codebase,
    /// Differing files, by relative name.
    pub file_diffs: Vec<FileDifference>,
}

impl CodebaseDifference {
    pub fn are_different(&self) -> bool {
        !self.file_diffs.is_empty()
    }

    /// Patch-style report of every differing file.
    pub fn render_patch(&self) -> String {
        let mut out = format!("diff {} {}\n", self.codebase1, self.codebase2);
        for fd in &self.file_diffs {
            let name = &fd.relative_filename;
            out.push_str(&format!(
                "diff --moe {}/{name} {}/{name}\n",
                self.codebase1, self.codebase2
            ));
            match fd.executability {
                Comparison::Only1 => out.push_str("-mode:executable\n"),
                Comparison::Only2 => out.push_str("+mode:executable\n"),
                Comparison::Same => {}
            }
            out.push_str(&format!("<<< {}/{name}\n", self.codebase1));
            out.push_str(&format!(">>> {}/{name}\n", self.codebase2));
            if let Some(diff) = &fd.content_diff {
                out.push_str(diff);
                out.push('\n');
            }
        }
        out
    }
}

pub struct CodebaseDiffer {
    differ: FileDiffer,
}

impl CodebaseDiffer {
    pub fn new(differ: FileDiffer) -> Self {
        Self { differ }
    }

    pub fn diff_codebases(
        &self,
        codebase1: &Codebase,
        codebase2: &Codebase,
    ) -> Result<CodebaseDifference, Problem> {
        let mut names: BTreeSet<String> = codebase1.relative_files()?;
        names.extend(codebase2.relative_files()?);

        let mut file_diffs = Vec::new();
        for name in names {
            let fd = self
                .differ
                .diff_files(&name, &codebase1.file(&name), &codebase2.file(&name))?;
            if fd.is_different() {
                file_diffs.push(fd);
            }
        }
        tracing::debug!(
            left = %codebase1,
            right = %codebase2,
            differing = file_diffs.len(),
            "diffed codebases"
        );
        Ok(CodebaseDifference {
            codebase1: codebase1.clone(),
            codebase2: codebase2.clone(),
            file_diffs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandOutput;
    use crate::testing::FnCommandRunner;
    use rstest::rstest;

    fn fd(existence: Comparison, executability: Comparison, content: Option<&str>) -> FileDifference {
        FileDifference {
            relative_filename: "foo".into(),
            file1: PathBuf::from("/1/foo"),
            file2: PathBuf::from("/2/foo"),
            existence,
            executability,
            content_diff: content.map(str::to_string),
        }
    }

    #[rstest]
    #[case(fd(Comparison::Same, Comparison::Same, None), false)]
    #[case(fd(Comparison::Only1, Comparison::Same, None), true)]
    #[case(fd(Comparison::Only2, Comparison::Same, None), true)]
    #[case(fd(Comparison::Same, Comparison::Only1, None), true)]
    #[case(fd(Comparison::Same, Comparison::Only2, None), true)]
    #[case(fd(Comparison::Same, Comparison::Same, Some("diff")), true)]
    fn is_different(#[case] difference: FileDifference, #[case] expected: bool) {
        assert_eq!(difference.is_different(), expected);
    }

    #[rstest]
    #[case(true, true, Comparison::Same)]
    #[case(false, false, Comparison::Same)]
    #[case(true, false, Comparison::Only1)]
    #[case(false, true, Comparison::Only2)]
    fn diff_bools(#[case] b1: bool, #[case] b2: bool, #[case] expected: Comparison) {
        assert_eq!(Comparison::diff_bools(b1, b2), expected);
    }

    fn pair(a: Option<&str>, b: Option<&str>) -> (tempfile::TempDir, PathBuf, PathBuf) {
        let tmp = tempfile::TempDir::new().unwrap();
        let f1 = tmp.path().join("one");
        let f2 = tmp.path().join("two");
        if let Some(a) = a {
            std::fs::write(&f1, a).unwrap();
        }
        if let Some(b) = b {
            std::fs::write(&f2, b).unwrap();
        }
        (tmp, f1, f2)
    }

    #[rstest]
    #[case(0, None)]
    #[case(1, Some("some diff"))]
    #[case(2, Some("some diff"))]
    fn external_statuses(#[case] status: i32, #[case] expected: Option<&str>) {
        let (_tmp, f1, f2) = pair(Some("a"), Some("b"));
        let runner = FnCommandRunner::new(move |_, _, _| {
            Ok(CommandOutput {
                status,
                stdout: "some diff".into(),
                stderr: String::new(),
            })
        });
        let differ = FileDiffer::new(runner, DiffEngine::External);
        let result = differ.diff_files("foo", &f1, &f2).unwrap();
        assert_eq!(result.content_diff.as_deref(), expected);
    }

    #[test]
    fn external_unknown_status_is_fatal() {
        let (_tmp, f1, f2) = pair(Some("a"), Some("b"));
        let runner = FnCommandRunner::new(|_, _, _| Ok(CommandOutput::with_status(7)));
        let err = FileDiffer::new(runner, DiffEngine::External)
            .diff_files("foo", &f1, &f2)
            .unwrap_err();
        assert_eq!(err.to_string(), "diff returned unknown status: 7");
    }

    #[test]
    fn external_diff_invocation() {
        let (_tmp, f1, f2) = pair(Some("a"), None);
        let runner = FnCommandRunner::new(|_, _, _| Ok(CommandOutput::with_status(0)));
        let differ = FileDiffer::new(runner.clone(), DiffEngine::External);
        let result = differ.diff_files("foo", &f1, &f2).unwrap();
        assert_eq!(result.existence, Comparison::Only1);
        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].starts_with("diff -N -u "), "got: {}", calls[0]);
    }

    #[test]
    fn neither_file_existing_is_fatal() {
        let (_tmp, f1, f2) = pair(None, None);
        let differ = FileDiffer::new(FnCommandRunner::never(), DiffEngine::Builtin);
        let err = differ.diff_files("foo", &f1, &f2).unwrap_err();
        assert!(err.to_string().starts_with("Neither file exists: "));
    }

    #[test]
    fn builtin_engine_produces_unified_diff() {
        let (_tmp, f1, f2) = pair(Some("a\nb\n"), Some("a\nc\n"));
        let differ = FileDiffer::new(FnCommandRunner::never(), DiffEngine::Builtin);
        let diff = differ.diff_files("foo", &f1, &f2).unwrap();
        let text = diff.content_diff.unwrap();
        assert!(text.contains("-b\n"), "got: {text}");
        assert!(text.contains("+c\n"), "got: {text}");

        let (_tmp, f1, f2) = pair(Some("same\n"), Some("same\n"));
        assert!(!differ.diff_files("foo", &f1, &f2).unwrap().is_different());
    }

    #[test]
    fn builtin_engine_flags_binary_files() {
        let (_tmp, f1, f2) = pair(Some("a\0b"), Some("a\0c"));
        let differ = FileDiffer::new(FnCommandRunner::never(), DiffEngine::Builtin);
        let text = differ.diff_files("foo", &f1, &f2).unwrap().content_diff.unwrap();
        assert!(text.starts_with("Binary files "));
    }
}
