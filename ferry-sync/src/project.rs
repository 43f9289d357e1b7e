use std::path::Path;
use std::rc::Rc;

use ferry_core::config::MigrationConfig;
use ferry_core::{CodebaseCreationError, ConfigError, EvalError, Expression, ProjectConfig};
use ferry_engine::{Codebase, ProjectContext, Toolbox, Ui};

use crate::repositories::{Repositories, Repository};

/// A loaded project: the evaluation context plus every configured
/// repository.
pub struct Project {
    context: ProjectContext,
    repositories: Repositories,
}

impl Project {
    pub fn new(config: ProjectConfig, tools: Rc<Toolbox>) -> Result<Self, ConfigError> {
        let repositories = Repositories::from_config(&config, &tools)?;
        let context = ProjectContext::new(config, tools, repositories.creators())?;
        tracing::debug!(
            project = %context.config().name,
            repositories = repositories.names().count(),
            "project loaded"
        );
        Ok(Self {
            context,
            repositories,
        })
    }

    pub fn load(path: &Path, tools: Rc<Toolbox>) -> Result<Self, ConfigError> {
        Self::new(ProjectConfig::load(path)?, tools)
    }

    pub fn context(&self) -> &ProjectContext {
        &self.context
    }

    pub fn config(&self) -> &ProjectConfig {
        self.context.config()
    }

    pub fn tools(&self) -> &Rc<Toolbox> {
        self.context.tools()
    }

    pub fn ui(&self) -> &dyn Ui {
        self.tools().ui.as_ref()
    }

    pub fn repositories(&self) -> &Repositories {
        &self.repositories
    }

    pub fn repository(&self, name: &str) -> Result<&Repository, CodebaseCreationError> {
        self.repositories.get(name)
    }

    pub fn migration(&self, name: &str) -> Option<&MigrationConfig> {
        self.config().migration(name)
    }

    pub fn evaluate(&self, expression: &Expression) -> Result<Codebase, EvalError> {
        self.context.evaluate(expression)
    }
}
