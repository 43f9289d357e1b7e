//! The evaluation context: the loaded project config plus every plugin
//! registry built from it.
//!
//! Registries are filled eagerly in [`ProjectContext::new`]; once a context
//! exists, every configured editor and translator is known to be usable.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use ferry_core::config::{EditorConfig, StepConfig, StepEditor, TranslatorConfig};
use ferry_core::{CodebaseCreationError, ConfigError, EvalError, Expression, ProjectConfig};

use crate::codebase::Codebase;
use crate::creator::{CodebaseCreator, FileCodebaseCreator, FILE_REPOSITORY};
use crate::editors::{build_editor, build_inverse_editor, Editor};
use crate::evaluator;
use crate::toolbox::Toolbox;
use crate::translation::{
    ForwardTranslationPipeline, InverseTranslationPipeline, InverseTranslatorStep, Translator,
    TranslatorStep,
};

/// Registry key of a translator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TranslatorPath {
    pub from_project_space: String,
    pub to_project_space: String,
}

impl TranslatorPath {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from_project_space: from.into(),
            to_project_space: to.into(),
        }
    }
}

impl fmt::Display for TranslatorPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}>{}", self.from_project_space, self.to_project_space)
    }
}

pub struct ProjectContext {
    config: ProjectConfig,
    tools: Rc<Toolbox>,
    file_creator: FileCodebaseCreator,
    creators: BTreeMap<String, Rc<dyn CodebaseCreator>>,
    editors: BTreeMap<String, Rc<dyn Editor>>,
    translators: BTreeMap<TranslatorPath, Translator>,
}

impl ProjectContext {
    /// Build every editor and translator `config` names.
    ///
    /// `creators` maps repository names to codebase creators; repository
    /// kinds live outside this crate.
    pub fn new(
        config: ProjectConfig,
        tools: Rc<Toolbox>,
        creators: BTreeMap<String, Rc<dyn CodebaseCreator>>,
    ) -> Result<Self, ConfigError> {
        let mut editors = BTreeMap::new();
        for (name, editor_config) in &config.editors {
            editors.insert(name.clone(), build_editor(name, editor_config, &tools)?);
        }

        let mut translators = BTreeMap::new();
        for translator in &config.translators {
            let path = TranslatorPath::new(
                &translator.from_project_space,
                &translator.to_project_space,
            );
            let built = if translator.inverse {
                build_inverse_translator(&config, translator, &editors, &tools)?
            } else {
                Translator::Forward(ForwardTranslationPipeline::new(forward_steps(
                    &config,
                    &translator.steps,
                    &editors,
                    &tools,
                )?))
            };
            tracing::debug!(translator = %path, inverse = translator.inverse, "built translator");
            translators.insert(path, built);
        }

        Ok(Self {
            file_creator: FileCodebaseCreator::new(Rc::clone(&tools)),
            config,
            tools,
            creators,
            editors,
            translators,
        })
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn tools(&self) -> &Rc<Toolbox> {
        &self.tools
    }

    /// The creator for `repository`; `file` is always available.
    pub fn creator(&self, repository: &str) -> Result<&dyn CodebaseCreator, CodebaseCreationError> {
        if repository == FILE_REPOSITORY {
            return Ok(&self.file_creator);
        }
        match self.creators.get(repository) {
            Some(creator) => Ok(creator.as_ref()),
            None => Err(CodebaseCreationError::new(format!(
                "No such repository '{repository}' in the config. Found: [{}]",
                self.creators.keys().cloned().collect::<Vec<_>>().join(", ")
            ))),
        }
    }

    pub fn editor(&self, name: &str) -> Option<&Rc<dyn Editor>> {
        self.editors.get(name)
    }

    pub fn translator(&self, path: &TranslatorPath) -> Option<&Translator> {
        self.translators.get(path)
    }

    pub fn translator_paths(&self) -> impl Iterator<Item = &TranslatorPath> {
        self.translators.keys()
    }

    pub fn evaluate(&self, expression: &Expression) -> Result<Codebase, EvalError> {
        evaluator::evaluate(expression, self)
    }
}

fn step_editor_config<'a>(
    config: &'a ProjectConfig,
    step: &'a StepConfig,
) -> Result<&'a EditorConfig, ConfigError> {
    match &step.editor {
        StepEditor::Inline(editor) => Ok(editor),
        StepEditor::Named(name) => config.editors.get(name).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "Translator step '{}' refers to unknown editor '{name}'",
                step.name
            ))
        }),
    }
}

fn forward_steps(
    config: &ProjectConfig,
    steps: &[StepConfig],
    editors: &BTreeMap<String, Rc<dyn Editor>>,
    tools: &Rc<Toolbox>,
) -> Result<Vec<TranslatorStep>, ConfigError> {
    steps
        .iter()
        .map(|step| {
            let editor = match &step.editor {
                StepEditor::Named(name) => match editors.get(name) {
                    Some(editor) => Rc::clone(editor),
                    None => build_editor(&step.name, step_editor_config(config, step)?, tools)?,
                },
                StepEditor::Inline(inline) => build_editor(&step.name, inline, tools)?,
            };
            Ok(TranslatorStep {
                name: step.name.clone(),
                editor,
            })
        })
        .collect()
}

/// Inverts the forward translator running the opposite way: its steps,
/// reversed, each through its editor's inverse.
fn build_inverse_translator(
    config: &ProjectConfig,
    translator: &TranslatorConfig,
    editors: &BTreeMap<String, Rc<dyn Editor>>,
    tools: &Rc<Toolbox>,
) -> Result<Translator, ConfigError> {
    let forward = config
        .translators
        .iter()
        .find(|t| {
            !t.inverse
                && t.from_project_space == translator.to_project_space
                && t.to_project_space == translator.from_project_space
        })
        .ok_or_else(|| {
            ConfigError::Invalid(format!(
                "Inverse translator {} has no forward translator {} to invert",
                TranslatorPath::new(&translator.from_project_space, &translator.to_project_space),
                TranslatorPath::new(&translator.to_project_space, &translator.from_project_space),
            ))
        })?;

    let forward_steps = forward_steps(config, &forward.steps, editors, tools)?;
    let mut inverse_steps = Vec::with_capacity(forward.steps.len());
    for step in forward.steps.iter().rev() {
        let name = format!("inverse_{}", step.name);
        let editor = build_inverse_editor(&name, step_editor_config(config, step)?, tools)?;
        inverse_steps.push(InverseTranslatorStep { name, editor });
    }

    let pipeline = InverseTranslationPipeline::new(forward_steps, inverse_steps)
        .map_err(|e| ConfigError::Invalid(e.to_string()))?;
    Ok(Translator::Inverse(pipeline))
}
