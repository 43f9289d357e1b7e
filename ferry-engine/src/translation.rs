//! Translation between project spaces.
//!
//! A forward pipeline runs its editors in order. An inverse pipeline undoes
//! the forward pipeline of the opposite translator with a diamond merge:
//!
//! 1. Evaluate the `referenceTargetCodebase` expression (the reference in
//!    the target space) and push it, then push the result of each forward
//!    step applied on top of the previous entry.
//! 2. Pop the fully translated reference as the first reference-from
//!    codebase, or evaluate `referenceFromCodebase` in its place.
//! 3. For each inverse step, pop the next reference-to codebase, inverse
//!    edit the pending change against the pair, and let that reference-to
//!    become the next reference-from.

use std::rc::Rc;

use ferry_core::expression::{parse_expression, REFERENCE_FROM_CODEBASE, REFERENCE_TARGET_CODEBASE};
use ferry_core::{CodebaseCreationError, EvalError, Options, Problem};

use crate::codebase::Codebase;
use crate::context::ProjectContext;
use crate::editors::{Editor, InverseEditor};
use crate::evaluator::evaluate;

#[derive(Clone)]
pub struct TranslatorStep {
    pub name: String,
    pub editor: Rc<dyn Editor>,
}

#[derive(Clone)]
pub struct InverseTranslatorStep {
    pub name: String,
    pub editor: Rc<dyn InverseEditor>,
}

pub enum Translator {
    Forward(ForwardTranslationPipeline),
    Inverse(InverseTranslationPipeline),
}

impl Translator {
    pub fn translate(
        &self,
        input: &Codebase,
        options: &Options,
        context: &ProjectContext,
    ) -> Result<Codebase, EvalError> {
        match self {
            Translator::Forward(pipeline) => pipeline.translate(input, options, context),
            Translator::Inverse(pipeline) => pipeline.translate(input, options, context),
        }
    }

    pub fn is_inverse(&self) -> bool {
        matches!(self, Translator::Inverse(_))
    }
}

// ---------------------------------------------------------------------------
// Forward
// ---------------------------------------------------------------------------

pub struct ForwardTranslationPipeline {
    steps: Vec<TranslatorStep>,
}

impl ForwardTranslationPipeline {
    pub fn new(steps: Vec<TranslatorStep>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[TranslatorStep] {
        &self.steps
    }

    pub fn translate(
        &self,
        input: &Codebase,
        options: &Options,
        context: &ProjectContext,
    ) -> Result<Codebase, EvalError> {
        let ui = &context.tools().ui;
        let mut current = input.clone();
        for step in &self.steps {
            let task = ui.push_task("edit", &format!("Translation editor: {}", step.name));
            current = step.editor.edit(&current, options)?;
            ui.pop_task(task, &current.root().display().to_string());
        }
        Ok(current)
    }
}

// ---------------------------------------------------------------------------
// Inverse
// ---------------------------------------------------------------------------

pub struct InverseTranslationPipeline {
    forward_steps: Vec<TranslatorStep>,
    inverse_steps: Vec<InverseTranslatorStep>,
}

impl InverseTranslationPipeline {
    /// `inverse_steps[i]` undoes `forward_steps[n - 1 - i]`.
    pub fn new(
        forward_steps: Vec<TranslatorStep>,
        inverse_steps: Vec<InverseTranslatorStep>,
    ) -> Result<Self, Problem> {
        if forward_steps.is_empty() || forward_steps.len() != inverse_steps.len() {
            return Err(Problem::new(format!(
                "Inverse translation needs one inverse step per forward step and at least one of each \
                 (got {} forward, {} inverse)",
                forward_steps.len(),
                inverse_steps.len()
            )));
        }
        Ok(Self {
            forward_steps,
            inverse_steps,
        })
    }

    pub fn inverse_steps(&self) -> &[InverseTranslatorStep] {
        &self.inverse_steps
    }

    pub fn translate(
        &self,
        input: &Codebase,
        options: &Options,
        context: &ProjectContext,
    ) -> Result<Codebase, EvalError> {
        let ui = &context.tools().ui;
        let target_text = options.get(REFERENCE_TARGET_CODEBASE).ok_or_else(|| {
            Problem::new(format!(
                "Inverse translation requires key '{REFERENCE_TARGET_CODEBASE}'."
            ))
        })?;
        let target_expression = parse_expression(target_text).map_err(|e| {
            CodebaseCreationError::new(format!("Couldn't parse in translation: {e}"))
        })?;

        let task = ui.push_task(
            "refTo",
            &format!("Pushing to forward-translation stack: {target_expression}"),
        );
        let reference_to = evaluate(&target_expression, context)?;
        ui.pop_task(task, &reference_to.root().display().to_string());

        let mut stack = vec![reference_to];
        for step in &self.forward_steps {
            let Some(top) = stack.last() else { break };
            let task = ui.push_task(
                "edit",
                &format!("Pushing to forward-translation stack: {}", step.name),
            );
            let edited = step.editor.edit(top, options)?;
            let informative = top.expression().edit_with(step.name.clone(), Options::new());
            ui.pop_task(task, &edited.root().display().to_string());
            stack.push(edited.with_expression(informative));
        }

        let mut reference_from = self.pop(&mut stack)?;
        if let Some(from_text) = options.get(REFERENCE_FROM_CODEBASE) {
            let from_expression = parse_expression(from_text).map_err(|e| {
                CodebaseCreationError::new(format!(
                    "Couldn't parse {REFERENCE_FROM_CODEBASE} '{from_text}': {e}"
                ))
            })?;
            reference_from = evaluate(&from_expression, context)?;
        }

        let mut translated = input.clone();
        for step in &self.inverse_steps {
            let reference_to = self.pop(&mut stack)?;
            let task = ui.push_task(
                "inverseEdit",
                &format!(
                    "Inverse-translating step {} by merging codebase {translated} onto {reference_to}",
                    step.name
                ),
            );
            translated = step
                .editor
                .inverse_edit(&translated, &reference_from, &reference_to, options)?;
            ui.pop_task(task, &translated.root().display().to_string());
            reference_from = reference_to;
        }
        Ok(translated)
    }

    fn pop(&self, stack: &mut Vec<Codebase>) -> Result<Codebase, Problem> {
        stack
            .pop()
            .ok_or_else(|| Problem::new("Forward-translation stack exhausted"))
    }
}
