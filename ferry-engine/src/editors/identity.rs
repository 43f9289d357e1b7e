use ferry_core::{EvalError, Options};

use super::Editor;
use crate::codebase::Codebase;

/// Returns its input unchanged.
pub struct IdentityEditor {
    name: String,
}

impl IdentityEditor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Editor for IdentityEditor {
    fn name(&self) -> &str {
        &self.name
    }

    fn edit(&self, input: &Codebase, _options: &Options) -> Result<Codebase, EvalError> {
        Ok(input.clone())
    }
}
