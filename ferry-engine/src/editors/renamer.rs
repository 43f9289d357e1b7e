//! Path renaming and its inverse.
//!
//! Mappings are tried in declaration order; the first whose pattern occurs
//! anywhere in a path rewrites its first occurrence, and leading slashes are
//! then trimmed. Every file must be covered by some mapping.

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use ferry_core::{ConfigError, EvalError, Options, Problem};
use regex::{NoExpand, Regex};

use super::{Editor, InverseEditor};
use crate::codebase::{Codebase, Lifetime};
use crate::files;
use crate::toolbox::Toolbox;

struct RenameRule {
    pattern: Regex,
    replacement: String,
    literal: bool,
}

pub struct RenamingEditor {
    name: String,
    rules: Vec<RenameRule>,
    tools: Rc<Toolbox>,
}

impl RenamingEditor {
    pub fn new(
        name: &str,
        mappings: &[(String, String)],
        use_regex: bool,
        tools: Rc<Toolbox>,
    ) -> Result<Self, ConfigError> {
        let mut rules = Vec::with_capacity(mappings.len());
        for (from, to) in mappings {
            let source = if use_regex {
                from.clone()
            } else {
                regex::escape(from)
            };
            let pattern = Regex::new(&source).map_err(|e| {
                ConfigError::Invalid(format!(
                    "Renamer '{name}' has an invalid mapping '{from}': {e}"
                ))
            })?;
            rules.push(RenameRule {
                pattern,
                replacement: to.clone(),
                literal: !use_regex,
            });
        }
        Ok(Self {
            name: name.to_string(),
            rules,
            tools,
        })
    }

    pub fn rename_file(&self, path: &str) -> Result<String, Problem> {
        for rule in &self.rules {
            if !rule.pattern.is_match(path) {
                continue;
            }
            let renamed = if rule.literal {
                rule.pattern.replacen(path, 1, NoExpand(&rule.replacement))
            } else {
                rule.pattern.replacen(path, 1, rule.replacement.as_str())
            };
            return Ok(renamed.trim_start_matches('/').to_string());
        }
        Err(Problem::new(format!(
            "Cannot find a rename mapping that covers file {path}. \
             Every file needs an applicable renaming rule."
        )))
    }
}

impl Editor for RenamingEditor {
    fn name(&self) -> &str {
        &self.name
    }

    fn edit(&self, input: &Codebase, _options: &Options) -> Result<Codebase, EvalError> {
        let dir = self.tools.scratch.create("rename_run_", Lifetime::Transient)?;
        for name in input.relative_files()? {
            let renamed = self.rename_file(&name)?;
            files::copy_file(&input.file(&name), &dir.path().join(&renamed))?;
        }
        Ok(Codebase::new(
            dir,
            input.project_space(),
            input.expression().clone(),
        ))
    }
}

// ---------------------------------------------------------------------------
// Inverse
// ---------------------------------------------------------------------------

/// Moves files back to where the reference codebase keeps them.
///
/// Every reference path is renamed forward and each pair of path prefixes
/// is remembered. An input file is then placed under the reference prefix of
/// its longest known renamed prefix; files with no known prefix keep their
/// path.
pub struct InverseRenamingEditor {
    renamer: RenamingEditor,
}

impl InverseRenamingEditor {
    pub fn new(renamer: RenamingEditor) -> Self {
        Self { renamer }
    }

    fn renamed_to_reference(
        &self,
        reference_files: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, String>, Problem> {
        let mut map = BTreeMap::new();
        for reference in reference_files {
            let renamed = self.renamer.rename_file(reference)?;
            let mut renamed_parts: Vec<&str> = renamed.split('/').collect();
            let mut reference_parts: Vec<&str> = reference.split('/').collect();
            while !renamed_parts.is_empty() && !reference_parts.is_empty() {
                map.entry(renamed_parts.join("/"))
                    .or_insert_with(|| reference_parts.join("/"));
                renamed_parts.pop();
                reference_parts.pop();
            }
        }
        Ok(map)
    }
}

fn inverse_rename(renamed: &str, map: &BTreeMap<String, String>) -> String {
    let parts: Vec<&str> = renamed.split('/').collect();
    for i in (1..=parts.len()).rev() {
        let prefix = parts[..i].join("/");
        if let Some(reference) = map.get(&prefix) {
            return format!("{reference}{}", &renamed[prefix.len()..]);
        }
    }
    tracing::debug!(file = renamed, "no reference location, keeping path");
    renamed.to_string()
}

impl InverseEditor for InverseRenamingEditor {
    fn name(&self) -> &str {
        &self.renamer.name
    }

    fn inverse_edit(
        &self,
        input: &Codebase,
        _reference_from: &Codebase,
        reference_to: &Codebase,
        _options: &Options,
    ) -> Result<Codebase, EvalError> {
        let dir = self
            .renamer
            .tools
            .scratch
            .create("inverse_rename_run_", Lifetime::Transient)?;
        let map = self.renamed_to_reference(&reference_to.relative_files()?)?;
        for name in input.relative_files()? {
            let target = inverse_rename(&name, &map);
            files::copy_file(&input.file(&name), &dir.path().join(&target))?;
        }
        Ok(Codebase::new(
            dir,
            reference_to.project_space(),
            reference_to.expression().clone(),
        ))
    }
}
