//! Turns an [`Expression`] into a [`Codebase`].
//!
//! Evaluation is recursive over the tree: the base is built first, then the
//! outermost operation is applied to it. Each level reports a task to the
//! context's progress sink.

use ferry_core::{CodebaseCreationError, EvalError, Expression, Term};

use crate::codebase::Codebase;
use crate::context::{ProjectContext, TranslatorPath};

pub fn evaluate(expression: &Expression, context: &ProjectContext) -> Result<Codebase, EvalError> {
    match expression {
        Expression::Repository(term) => create_repository(term, context),
        Expression::Edit { base, term } => {
            let input = evaluate(base, context)?;
            let editor = context.editor(term.identifier()).ok_or_else(|| {
                CodebaseCreationError::new(format!("no editor {}", term.identifier()))
            })?;

            let ui = &context.tools().ui;
            let task = ui.push_task(
                "edit",
                &format!("Editing {input} with editor {}", editor.name()),
            );
            let edited = editor.edit(&input, term.options())?;
            ui.pop_task(task, &edited.root().display().to_string());
            Ok(edited.with_expression(expression.clone()))
        }
        Expression::Translate { base, term } => {
            let input = evaluate(base, context)?;
            let path = TranslatorPath::new(input.project_space(), term.identifier());
            let translator = context.translator(&path).ok_or_else(|| {
                CodebaseCreationError::new(format!(
                    "Could not find translator from project space \"{}\" to \"{}\".\n\
                     Translators only available for [{}]",
                    path.from_project_space,
                    path.to_project_space,
                    context
                        .translator_paths()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })?;

            let ui = &context.tools().ui;
            let task = ui.push_task(
                "translate",
                &format!(
                    "Translating {input} from project space \"{}\" to \"{}\"",
                    path.from_project_space, path.to_project_space
                ),
            );
            let translated = translator.translate(&input, term.options(), context)?;
            ui.pop_task(task, &translated.root().display().to_string());
            Ok(translated
                .with_project_space(term.identifier())
                .with_expression(expression.clone()))
        }
    }
}

fn create_repository(term: &Term, context: &ProjectContext) -> Result<Codebase, EvalError> {
    let creator = context.creator(term.identifier())?;
    let ui = &context.tools().ui;
    let task = ui.push_task("create_codebase", &format!("Creating codebase for '{term}'"));
    let codebase = creator.create(term.options())?;
    ui.pop_task(task, &codebase.root().display().to_string());
    Ok(codebase)
}
