use std::rc::Rc;

use crate::codebase::ScratchSpace;
use crate::command::{CommandRunner, SystemCommandRunner};
use crate::ui::{TracingUi, Ui};

/// Services every component receives at construction: the progress sink,
/// the process runner and the scratch-directory allocator.
pub struct Toolbox {
    pub ui: Rc<dyn Ui>,
    pub runner: Rc<dyn CommandRunner>,
    pub scratch: ScratchSpace,
}

impl Toolbox {
    pub fn new(ui: Rc<dyn Ui>, runner: Rc<dyn CommandRunner>, scratch: ScratchSpace) -> Self {
        Self {
            ui,
            runner,
            scratch,
        }
    }

    /// Real processes, `tracing` output, system temp directory.
    pub fn system() -> Self {
        Self::new(
            Rc::new(TracingUi),
            Rc::new(SystemCommandRunner),
            ScratchSpace::system(),
        )
    }
}
