//! Progress reporting.
//!
//! Every evaluation step pushes a named task on entry and pops it on exit.
//! The sink is injected through [`Toolbox`](crate::Toolbox); nothing here is
//! global.

use std::cell::RefCell;

/// One progress event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    TaskStarted { name: String, description: String },
    TaskFinished { name: String, result: String },
    Message(String),
}

/// Handle returned by [`Ui::push_task`]; hand it back to [`Ui::pop_task`].
#[derive(Debug)]
#[must_use = "pop the task when the step finishes"]
pub struct Task {
    name: String,
}

impl Task {
    pub fn name(&self) -> &str {
        &self.name
    }
}

pub trait Ui {
    fn report(&self, event: UiEvent);

    fn push_task(&self, name: &str, description: &str) -> Task {
        self.report(UiEvent::TaskStarted {
            name: name.to_string(),
            description: description.to_string(),
        });
        Task {
            name: name.to_string(),
        }
    }

    fn pop_task(&self, task: Task, result: &str) {
        self.report(UiEvent::TaskFinished {
            name: task.name,
            result: result.to_string(),
        });
    }

    fn message(&self, text: &str) {
        self.report(UiEvent::Message(text.to_string()));
    }
}

/// Forwards progress to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingUi;

impl Ui for TracingUi {
    fn report(&self, event: UiEvent) {
        match event {
            UiEvent::TaskStarted { name, description } => {
                tracing::info!(task = %name, "{description}");
            }
            UiEvent::TaskFinished { name, result } => {
                if result.is_empty() {
                    tracing::debug!(task = %name, "done");
                } else {
                    tracing::debug!(task = %name, "done: {result}");
                }
            }
            UiEvent::Message(text) => tracing::info!("{text}"),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingUi {
    events: RefCell<Vec<UiEvent>>,
}

impl RecordingUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<UiEvent> {
        self.events.borrow().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                UiEvent::Message(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }

    /// Names of started tasks, in order.
    pub fn task_names(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                UiEvent::TaskStarted { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Ui for RecordingUi {
    fn report(&self, event: UiEvent) {
        self.events.borrow_mut().push(event);
    }
}
