//! Filesystem helpers shared by creators, editors and the merger.

use std::collections::BTreeSet;
use std::path::Path;

use ferry_core::error::{io_err, Problem};
use is_executable::IsExecutable;
use walkdir::WalkDir;

/// Relative names (`/`-separated) of every file under `root`.
pub fn list_files(root: &Path) -> Result<BTreeSet<String>, Problem> {
    let mut files = BTreeSet::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| walk_err(root, e))?;
        if entry.file_type().is_dir() {
            continue;
        }
        files.insert(relative_name(root, entry.path()));
    }
    Ok(files)
}

pub fn relative_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Copy one file, creating parent directories. Permissions come along.
pub fn copy_file(from: &Path, to: &Path) -> Result<(), Problem> {
    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    std::fs::copy(from, to).map_err(|e| {
        Problem::new(format!(
            "Failed to copy {} to {}: {e}",
            from.display(),
            to.display()
        ))
    })?;
    Ok(())
}

/// Copy every file under `from` whose relative name passes `keep`.
pub fn copy_tree(from: &Path, to: &Path, keep: impl Fn(&str) -> bool) -> Result<(), Problem> {
    std::fs::create_dir_all(to).map_err(|e| io_err(to, e))?;
    for name in list_files(from)? {
        if keep(&name) {
            copy_file(&from.join(&name), &to.join(&name))?;
        }
    }
    Ok(())
}

pub fn is_executable(path: &Path) -> bool {
    path.is_file() && path.is_executable()
}

pub fn same_contents(a: &Path, b: &Path) -> Result<bool, Problem> {
    let left = std::fs::read(a).map_err(|e| io_err(a, e))?;
    let right = std::fs::read(b).map_err(|e| io_err(b, e))?;
    Ok(left == right)
}

fn walk_err(root: &Path, err: walkdir::Error) -> Problem {
    let path = err
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.to_path_buf());
    match err.into_io_error() {
        Some(source) => io_err(path, source),
        None => Problem::new(format!("Filesystem loop under {}", path.display())),
    }
}
