//! Repository registry: one history, codebase creator and writer creator
//! per configured repository, built when the project loads.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::rc::Rc;

use regex::Regex;

use ferry_core::config::RepositoryConfig;
use ferry_core::{CodebaseCreationError, ConfigError, ProjectConfig};
use ferry_engine::{CodebaseCreator, Toolbox};

use crate::history::RevisionHistory;
use crate::local::{LocalCodebaseCreator, LocalRepository, LocalWriterCreator, LOCAL_REPOSITORY_TYPE};
use crate::writer::WriterCreator;

pub struct Repository {
    pub name: String,
    pub project_space: String,
    pub history: Rc<dyn RevisionHistory>,
    pub creator: Rc<dyn CodebaseCreator>,
    pub writer_creator: Rc<dyn WriterCreator>,
}

#[derive(Default)]
pub struct Repositories {
    repositories: BTreeMap<String, Repository>,
}

impl Repositories {
    pub fn from_config(config: &ProjectConfig, tools: &Rc<Toolbox>) -> Result<Self, ConfigError> {
        let mut repositories = BTreeMap::new();
        for (name, repo_config) in &config.repositories {
            repositories.insert(name.clone(), build_repository(name, repo_config, tools)?);
        }
        Ok(Self { repositories })
    }

    pub fn get(&self, name: &str) -> Result<&Repository, CodebaseCreationError> {
        self.repositories.get(name).ok_or_else(|| {
            CodebaseCreationError::new(format!(
                "No such repository '{name}' in the config. Found: [{}]",
                self.names().collect::<Vec<_>>().join(", ")
            ))
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.repositories.keys().map(String::as_str)
    }

    /// Codebase creators keyed by repository name, for the evaluation
    /// context.
    pub fn creators(&self) -> BTreeMap<String, Rc<dyn CodebaseCreator>> {
        self.repositories
            .iter()
            .map(|(name, repo)| (name.clone(), Rc::clone(&repo.creator)))
            .collect()
    }
}

fn build_repository(
    name: &str,
    config: &RepositoryConfig,
    tools: &Rc<Toolbox>,
) -> Result<Repository, ConfigError> {
    if config.repository_type != LOCAL_REPOSITORY_TYPE {
        return Err(ConfigError::Invalid(format!(
            "Repository '{name}' has unsupported type '{}'; supported: [{LOCAL_REPOSITORY_TYPE}]",
            config.repository_type
        )));
    }
    let url = config.url.as_deref().ok_or_else(|| {
        ConfigError::Invalid(format!("Repository '{name}' of type local requires a url"))
    })?;

    let mut ignore = Vec::with_capacity(config.ignore_file_patterns.len());
    for pattern in &config.ignore_file_patterns {
        ignore.push(Regex::new(pattern).map_err(|e| {
            ConfigError::Invalid(format!(
                "Repository '{name}' has a bad ignore_file_patterns entry '{pattern}': {e}"
            ))
        })?);
    }

    let local = Rc::new(LocalRepository::new(
        name,
        PathBuf::from(url),
        &config.project_space,
        ignore,
    ));
    tracing::debug!(repository = name, url, "registered local repository");
    Ok(Repository {
        name: name.to_string(),
        project_space: config.project_space.clone(),
        history: local.clone(),
        creator: Rc::new(LocalCodebaseCreator::new(local.clone(), Rc::clone(tools))),
        writer_creator: Rc::new(LocalWriterCreator::new(local, Rc::clone(tools))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_engine::testing::{toolbox, FnCommandRunner};

    fn config(json: &str) -> ProjectConfig {
        ProjectConfig::from_json_str(json).unwrap()
    }

    #[test]
    fn builds_local_repositories() {
        let (tools, _) = toolbox(FnCommandRunner::never());
        let repos = Repositories::from_config(
            &config(
                r#"{"name": "p", "repositories": {
                    "internal": {"type": "local", "url": "/i", "project_space": "internal"},
                    "public": {"type": "local", "url": "/p"}}}"#,
            ),
            &tools,
        )
        .unwrap();
        assert_eq!(repos.names().collect::<Vec<_>>(), vec!["internal", "public"]);
        assert_eq!(repos.get("public").unwrap().project_space, "public");
        assert_eq!(repos.creators().len(), 2);
        assert_eq!(
            repos.get("nope").err().unwrap().to_string(),
            "No such repository 'nope' in the config. Found: [internal, public]"
        );
    }

    #[test]
    fn rejects_unsupported_type_and_bad_patterns() {
        let (tools, _) = toolbox(FnCommandRunner::never());
        let err = Repositories::from_config(
            &config(r#"{"name": "p", "repositories": {"r": {"type": "svn", "url": "/r"}}}"#),
            &tools,
        )
        .err()
        .unwrap();
        assert!(err.to_string().contains("unsupported type 'svn'"), "{err}");

        let mut unchecked =
            config(r#"{"name": "p", "repositories": {"r": {"type": "local", "url": "/r"}}}"#);
        unchecked
            .repositories
            .get_mut("r")
            .unwrap()
            .ignore_file_patterns = vec!["(".into()];
        let err = Repositories::from_config(&unchecked, &tools).err().unwrap();
        assert!(err.to_string().contains("ignore_file_patterns"), "{err}");
    }
}
