//! Per-todo view/edit state machine.
//!
//! An `ItemEditor` holds no authoritative data. It owns the draft for one
//! todo while that todo is being edited and turns user intent into
//! `ListController` calls.

use shared::{
    domain::{Todo, TodoId},
    protocol::TodoUpdate,
};
use tracing::debug;

use crate::controller::{normalized_description, normalized_title, ListController, Outcome};

/// Draft title and description for a todo in edit mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditBuffer {
    pub title: String,
    pub description: String,
}

impl EditBuffer {
    fn seeded_from(todo: &Todo) -> Self {
        Self {
            title: todo.title.clone(),
            description: todo.description.clone().unwrap_or_default(),
        }
    }

    /// A whitespace-only title counts as empty.
    pub fn can_save(&self) -> bool {
        !self.title.trim().is_empty()
    }

    fn to_patch(&self) -> Option<TodoUpdate> {
        Some(TodoUpdate {
            title: Some(normalized_title(&self.title)?),
            description: normalized_description(Some(self.description.as_str())),
            completed: None,
        })
    }
}

/// What a `Saving` editor is waiting on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveKind {
    Edit(EditBuffer),
    Toggle,
    Delete,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EditorState {
    #[default]
    Viewing,
    Editing(EditBuffer),
    Saving(SaveKind),
}

/// Which affordances a renderer should enable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Controls {
    pub edit: bool,
    pub toggle: bool,
    pub delete: bool,
    pub save: bool,
    pub cancel: bool,
    pub fields: bool,
}

/// The values a renderer should show for one todo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayFields<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemEditor {
    todo_id: TodoId,
    state: EditorState,
}

impl ItemEditor {
    pub fn new(todo_id: TodoId) -> Self {
        Self {
            todo_id,
            state: EditorState::Viewing,
        }
    }

    pub fn todo_id(&self) -> TodoId {
        self.todo_id
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.state, EditorState::Editing(_))
    }

    pub fn is_saving(&self) -> bool {
        matches!(self.state, EditorState::Saving(_))
    }

    pub fn draft(&self) -> Option<&EditBuffer> {
        match &self.state {
            EditorState::Editing(buffer) | EditorState::Saving(SaveKind::Edit(buffer)) => {
                Some(buffer)
            }
            _ => None,
        }
    }

    /// `Viewing -> Editing`, seeding the draft from `todo`.
    pub fn begin_edit(&mut self, todo: &Todo) -> bool {
        if todo.id != self.todo_id || self.state != EditorState::Viewing {
            return false;
        }
        self.state = EditorState::Editing(EditBuffer::seeded_from(todo));
        true
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> bool {
        match &mut self.state {
            EditorState::Editing(buffer) => {
                buffer.title = title.into();
                true
            }
            _ => false,
        }
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> bool {
        match &mut self.state {
            EditorState::Editing(buffer) => {
                buffer.description = description.into();
                true
            }
            _ => false,
        }
    }

    /// `Editing -> Viewing`; the draft is dropped and nothing is sent.
    pub fn cancel(&mut self) -> bool {
        if !self.is_editing() {
            return false;
        }
        self.state = EditorState::Viewing;
        true
    }

    /// `Editing -> Saving` and the patch to send, or `None` if the draft
    /// title is blank (the editor stays in `Editing`).
    pub fn start_save(&mut self) -> Option<TodoUpdate> {
        let EditorState::Editing(buffer) = &self.state else {
            return None;
        };
        let patch = buffer.to_patch()?;
        let buffer = buffer.clone();
        self.state = EditorState::Saving(SaveKind::Edit(buffer));
        Some(patch)
    }

    /// `Viewing -> Saving` with a patch that flips only `completed`.
    pub fn start_toggle(&mut self, todo: &Todo) -> Option<TodoUpdate> {
        if todo.id != self.todo_id || self.state != EditorState::Viewing {
            return None;
        }
        self.state = EditorState::Saving(SaveKind::Toggle);
        Some(TodoUpdate::completed(!todo.completed))
    }

    pub fn start_delete(&mut self) -> bool {
        if self.state != EditorState::Viewing {
            return false;
        }
        self.state = EditorState::Saving(SaveKind::Delete);
        true
    }

    /// Back to `Viewing` whatever the outcome. A failed save drops the draft
    /// too: the controller left the todo untouched, so its last known
    /// values are what show.
    pub fn finish(&mut self, outcome: Outcome) {
        if self.is_saving() {
            debug!(todo_id = self.todo_id.0, ?outcome, "editor operation resolved");
            self.state = EditorState::Viewing;
        }
    }

    pub async fn save(&mut self, controller: &ListController) -> Outcome {
        if controller.is_busy(self.todo_id).await {
            return Outcome::Refused;
        }
        let Some(patch) = self.start_save() else {
            return Outcome::Refused;
        };
        let outcome = controller.update(self.todo_id, patch).await;
        self.finish(outcome);
        outcome
    }

    /// Flips completion based on the controller's current copy of the todo.
    pub async fn toggle(&mut self, controller: &ListController) -> Outcome {
        if controller.is_busy(self.todo_id).await {
            return Outcome::Refused;
        }
        let Some(todo) = controller.get(self.todo_id).await else {
            return Outcome::Vanished;
        };
        let Some(patch) = self.start_toggle(&todo) else {
            return Outcome::Refused;
        };
        let outcome = controller.update(self.todo_id, patch).await;
        self.finish(outcome);
        outcome
    }

    /// Delete is confirmed by the controller before anything is sent.
    pub async fn delete(&mut self, controller: &ListController) -> Outcome {
        if controller.is_busy(self.todo_id).await || !self.start_delete() {
            return Outcome::Refused;
        }
        let outcome = controller.delete(self.todo_id).await;
        self.finish(outcome);
        outcome
    }

    pub fn display<'a>(&'a self, todo: &'a Todo) -> DisplayFields<'a> {
        match self.draft() {
            Some(buffer) => DisplayFields {
                title: &buffer.title,
                description: Some(buffer.description.as_str()).filter(|d| !d.is_empty()),
                completed: todo.completed,
            },
            None => DisplayFields {
                title: &todo.title,
                description: todo.description.as_deref(),
                completed: todo.completed,
            },
        }
    }

    /// `busy` is the controller's in-flight marker for this todo.
    pub fn controls(&self, busy: bool) -> Controls {
        match &self.state {
            EditorState::Viewing => Controls {
                edit: !busy,
                toggle: !busy,
                delete: !busy,
                ..Controls::default()
            },
            EditorState::Editing(buffer) => Controls {
                save: !busy && buffer.can_save(),
                cancel: true,
                fields: true,
                ..Controls::default()
            },
            EditorState::Saving(_) => Controls::default(),
        }
    }
}

#[cfg(test)]
#[path = "tests/editor_tests.rs"]
mod tests;
