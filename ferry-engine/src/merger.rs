//! Three-way merge of codebases with `merge(1)`.
//!
//! `merge(original, modified, destination)` replays the change from
//! `original` to `modified` onto `destination`. Each file in the union of
//! `destination` and `modified` is handled independently:
//!
//! | original | destination | modified | action |
//! |----------|-------------|----------|--------|
//! | yes      | one side only, identical to original | | skipped: the deletion wins |
//! | no       | one side only | | copied as is |
//! | no       | yes         | yes      | merged against an empty original |
//! | otherwise |            |          | destination copied, then merged |
//!
//! Conflicts leave markers in the merged file and are reported, not raised.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use ferry_core::error::{io_err, Problem};
use ferry_core::Expression;

use crate::codebase::{Codebase, Lifetime};
use crate::files;
use crate::toolbox::Toolbox;
use crate::ui::Ui;

const NULL_DEVICE: &str = "/dev/null";

#[derive(Debug, Clone)]
pub struct MergeResult {
    pub merged_codebase: Codebase,
    /// Relative names merged cleanly.
    pub merged_files: BTreeSet<String>,
    /// Relative names left with conflict markers.
    pub failed_files: BTreeSet<String>,
}

impl MergeResult {
    pub fn report(&self, ui: &dyn Ui) {
        ui.message(&format!(
            "Merged codebase generated at: {}",
            self.merged_codebase.root().display()
        ));
        if self.failed_files.is_empty() {
            ui.message(&format!(
                "{} files merged successfully. No merge conflicts.",
                self.merged_files.len()
            ));
        } else {
            let conflicted = self
                .failed_files
                .iter()
                .map(|f| self.merged_codebase.file(f).display().to_string())
                .collect::<Vec<_>>()
                .join("\n");
            ui.message(&format!(
                "{} files merged successfully.\n{} files have merge conflicts. \
                 Edit the following files to resolve conflicts:\n{conflicted}",
                self.merged_files.len(),
                self.failed_files.len()
            ));
        }
    }
}

pub struct CodebaseMerger {
    tools: Rc<Toolbox>,
}

impl CodebaseMerger {
    pub fn new(tools: Rc<Toolbox>) -> Self {
        Self { tools }
    }

    pub fn merge(
        &self,
        original: &Codebase,
        modified: &Codebase,
        destination: &Codebase,
    ) -> Result<MergeResult, Problem> {
        let dir = self
            .tools
            .scratch
            .create("merged_codebase_", Lifetime::Transient)?;
        let mut result = MergeResult {
            merged_codebase: Codebase::new(dir, "merged", Expression::repository("merged")),
            merged_files: BTreeSet::new(),
            failed_files: BTreeSet::new(),
        };

        let mut names = destination.relative_files()?;
        names.extend(modified.relative_files()?);
        for name in &names {
            self.merge_file(original, modified, destination, name, &mut result)?;
        }

        result.report(self.tools.ui.as_ref());
        Ok(result)
    }

    fn merge_file(
        &self,
        original: &Codebase,
        modified: &Codebase,
        destination: &Codebase,
        name: &str,
        result: &mut MergeResult,
    ) -> Result<(), Problem> {
        let orig = original.file(name);
        let dest = destination.file(name);
        let modi = modified.file(name);
        let (orig_exists, dest_exists, mod_exists) = (orig.exists(), dest.exists(), modi.exists());

        if dest_exists != mod_exists {
            let surviving = if dest_exists { &dest } else { &modi };
            if !orig_exists {
                files::copy_file(surviving, &result.merged_codebase.file(name))?;
                return Ok(());
            }
            if files::same_contents(&orig, surviving)? {
                tracing::debug!(file = name, "deleted on one side, unchanged on the other");
                return Ok(());
            }
        }

        let null = PathBuf::from(NULL_DEVICE);
        let orig_input = if orig_exists { orig } else { null.clone() };
        let mod_input = if mod_exists { modi } else { null.clone() };

        let merged_file = result.merged_codebase.file(name);
        if dest_exists {
            files::copy_file(&dest, &merged_file)?;
        } else {
            create_empty(&merged_file)?;
        }

        let merged_arg = merged_file.to_string_lossy();
        let orig_arg = orig_input.to_string_lossy();
        let mod_arg = mod_input.to_string_lossy();
        let output = self.tools.runner.run(
            "merge",
            &[merged_arg.as_ref(), orig_arg.as_ref(), mod_arg.as_ref()],
            result.merged_codebase.root(),
        )?;
        match output.status {
            0 => {
                result.merged_files.insert(name.to_string());
            }
            1 => {
                tracing::warn!(file = name, "merge conflict");
                result.failed_files.insert(name.to_string());
            }
            other => {
                let dest_arg = if dest_exists { dest } else { null };
                return Err(Problem::new(format!(
                    "Merge returned with unexpected status {other} when trying to run \"merge -p {} {orig_arg} {mod_arg}\"",
                    dest_arg.display()
                )));
            }
        }
        Ok(())
    }
}

fn create_empty(path: &Path) -> Result<(), Problem> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    std::fs::write(path, b"").map_err(|e| io_err(path, e))
}
