use std::rc::Rc;

use ferry_core::{EvalError, Options};

use super::InverseEditor;
use crate::codebase::Codebase;
use crate::merger::CodebaseMerger;
use crate::toolbox::Toolbox;

/// Inverts a step with no structural inverse by replaying the caller's
/// change (`reference_from` to `input`) onto `reference_to`.
pub struct MergingInverseEditor {
    name: String,
    merger: CodebaseMerger,
}

impl MergingInverseEditor {
    pub fn new(name: impl Into<String>, tools: Rc<Toolbox>) -> Self {
        Self {
            name: name.into(),
            merger: CodebaseMerger::new(tools),
        }
    }
}

impl InverseEditor for MergingInverseEditor {
    fn name(&self) -> &str {
        &self.name
    }

    fn inverse_edit(
        &self,
        input: &Codebase,
        reference_from: &Codebase,
        reference_to: &Codebase,
        _options: &Options,
    ) -> Result<Codebase, EvalError> {
        let result = self.merger.merge(reference_from, input, reference_to)?;
        Ok(result.merged_codebase)
    }
}
