//! The authoritative local copy of the todo list.
//!
//! `ListController` is the only component that talks to the remote. Local
//! state changes only after the remote confirms an operation, and the
//! canonical value from the response is what lands in the list.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use anyhow::anyhow;
use shared::{
    domain::{Todo, TodoCounts, TodoId},
    protocol::{TodoCreate, TodoUpdate},
};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    error::{ErrorState, OperationError},
    remote::{DeleteConfirmation, TodoRemote},
};

/// How a controller operation resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The remote confirmed the operation and the list was patched.
    Applied,
    /// The target todo is not (or no longer) in the list; nothing changed.
    Vanished,
    /// The remote call failed; the error banner was set.
    Failed,
    /// The user declined the delete confirmation.
    Declined,
    /// The request was not sent: blank input or an action the current
    /// editor state does not allow.
    Refused,
}

impl Outcome {
    pub fn is_applied(self) -> bool {
        self == Self::Applied
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Update,
    Delete,
}

/// Marks a todo with at least one request in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingMutation {
    /// The most recently issued kind.
    pub kind: MutationKind,
    pub in_flight: usize,
}

/// Input for `ListController::create`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTodo {
    pub title: String,
    pub description: Option<String>,
}

impl NewTodo {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn into_request(self) -> Option<TodoCreate> {
        Some(TodoCreate {
            title: normalized_title(&self.title)?,
            description: normalized_description(self.description.as_deref()),
            completed: false,
        })
    }
}

pub(crate) fn normalized_title(title: &str) -> Option<String> {
    let title = title.trim();
    (!title.is_empty()).then(|| title.to_string())
}

/// Blank descriptions are omitted rather than sent as empty strings.
pub(crate) fn normalized_description(description: Option<&str>) -> Option<String> {
    description.and_then(|description| {
        let description = description.trim();
        (!description.is_empty()).then(|| description.to_string())
    })
}

/// Everything a renderer needs, copied out under one lock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListSnapshot {
    pub todos: Vec<Todo>,
    pub pending: HashMap<TodoId, PendingMutation>,
    pub creating: bool,
    pub loading: bool,
    pub error: Option<ErrorState>,
}

impl ListSnapshot {
    pub fn counts(&self) -> TodoCounts {
        TodoCounts::tally(&self.todos)
    }

    pub fn is_busy(&self, todo_id: TodoId) -> bool {
        self.pending.contains_key(&todo_id)
    }
}

#[derive(Default)]
struct ListState {
    todos: Vec<Todo>,
    pending: HashMap<TodoId, PendingMutation>,
    creates_in_flight: usize,
    loads_in_flight: usize,
    error: Option<ErrorState>,
}

impl ListState {
    fn position(&self, todo_id: TodoId) -> Option<usize> {
        self.todos.iter().position(|todo| todo.id == todo_id)
    }

    fn contains(&self, todo_id: TodoId) -> bool {
        self.position(todo_id).is_some()
    }

    fn begin_mutation(&mut self, todo_id: TodoId, kind: MutationKind) {
        self.pending
            .entry(todo_id)
            .and_modify(|pending| {
                pending.kind = kind;
                pending.in_flight += 1;
            })
            .or_insert(PendingMutation { kind, in_flight: 1 });
    }

    fn end_mutation(&mut self, todo_id: TodoId) {
        if let Some(pending) = self.pending.get_mut(&todo_id) {
            pending.in_flight = pending.in_flight.saturating_sub(1);
            if pending.in_flight == 0 {
                self.pending.remove(&todo_id);
            }
        }
    }

    /// Busy markers never outlive the todo they belong to.
    fn forget_missing_pending(&mut self) {
        let present: HashSet<TodoId> = self.todos.iter().map(|todo| todo.id).collect();
        self.pending.retain(|todo_id, _| present.contains(todo_id));
    }

    fn record_failure(&mut self, err: OperationError, todo_id: Option<TodoId>) {
        error!(
            operation = %err.kind(),
            todo_id = todo_id.map(|id| id.0),
            error = %format!("{:#}", err.cause()),
            "{err}"
        );
        self.error = Some(err.to_error_state());
    }

    fn snapshot(&self) -> ListSnapshot {
        ListSnapshot {
            todos: self.todos.clone(),
            pending: self.pending.clone(),
            creating: self.creates_in_flight > 0,
            loading: self.loads_in_flight > 0,
            error: self.error.clone(),
        }
    }
}

/// Keeps the first occurrence of every id.
fn dedupe_by_id(todos: Vec<Todo>) -> Vec<Todo> {
    let mut seen = HashSet::with_capacity(todos.len());
    todos
        .into_iter()
        .filter(|todo| {
            let first = seen.insert(todo.id);
            if !first {
                warn!(todo_id = todo.id.0, "dropping duplicate todo from list response");
            }
            first
        })
        .collect()
}

/// Owns the todo list and arbitrates every remote mutation of it.
///
/// Operations take `&self` and never hold the state lock across a remote
/// call, so requests for different todos (or the same one) may overlap.
/// Each resolution is applied to the list as it is when the response
/// arrives.
pub struct ListController {
    remote: Arc<dyn TodoRemote>,
    confirmation: Arc<dyn DeleteConfirmation>,
    inner: Mutex<ListState>,
}

impl ListController {
    pub fn new(remote: Arc<dyn TodoRemote>, confirmation: Arc<dyn DeleteConfirmation>) -> Self {
        Self {
            remote,
            confirmation,
            inner: Mutex::new(ListState::default()),
        }
    }

    /// Replaces the whole list with the remote collection. On failure the
    /// previous list is kept.
    pub async fn load(&self) -> Outcome {
        self.inner.lock().await.loads_in_flight += 1;
        let result = self.remote.list().await;

        let mut inner = self.inner.lock().await;
        inner.loads_in_flight = inner.loads_in_flight.saturating_sub(1);
        match result {
            Ok(todos) => {
                inner.todos = dedupe_by_id(todos);
                inner.forget_missing_pending();
                info!(count = inner.todos.len(), "todos loaded");
                Outcome::Applied
            }
            Err(source) => {
                inner.record_failure(OperationError::Load { source }, None);
                Outcome::Failed
            }
        }
    }

    /// Creates a todo and prepends the service's copy of it.
    pub async fn create(&self, input: NewTodo) -> Outcome {
        let Some(request) = input.into_request() else {
            debug!("refusing to create a todo with a blank title");
            return Outcome::Refused;
        };

        self.inner.lock().await.creates_in_flight += 1;
        let result = self.remote.create(request).await;

        let mut inner = self.inner.lock().await;
        inner.creates_in_flight = inner.creates_in_flight.saturating_sub(1);
        match result {
            Ok(todo) => {
                let todo_id = todo.id;
                // A reload that raced the create may already hold this id.
                inner.todos.retain(|existing| existing.id != todo_id);
                inner.todos.insert(0, todo);
                info!(todo_id = todo_id.0, "todo created");
                Outcome::Applied
            }
            Err(source) => {
                inner.record_failure(OperationError::Create { source }, None);
                Outcome::Failed
            }
        }
    }

    /// Sends `patch` and swaps in the service's canonical todo at the same
    /// position. If the todo left the list while the request was in flight
    /// the response is ignored.
    pub async fn update(&self, todo_id: TodoId, patch: TodoUpdate) -> Outcome {
        {
            let mut inner = self.inner.lock().await;
            if !inner.contains(todo_id) {
                debug!(todo_id = todo_id.0, "update target is not in the list");
                return Outcome::Vanished;
            }
            inner.begin_mutation(todo_id, MutationKind::Update);
        }

        let result = self.remote.update(todo_id, patch).await;

        let mut inner = self.inner.lock().await;
        inner.end_mutation(todo_id);
        let Some(index) = inner.position(todo_id) else {
            match &result {
                Ok(_) => debug!(todo_id = todo_id.0, "update resolved for a removed todo"),
                Err(error) => warn!(
                    todo_id = todo_id.0,
                    error = %format!("{error:#}"),
                    "update failed for a removed todo"
                ),
            }
            return Outcome::Vanished;
        };

        match result {
            Ok(todo) if todo.id != todo_id => {
                let source = anyhow!(
                    "server returned todo {} for an update of todo {todo_id}",
                    todo.id
                );
                inner.record_failure(OperationError::Update { source }, Some(todo_id));
                Outcome::Failed
            }
            Ok(todo) => {
                inner.todos[index] = todo;
                info!(todo_id = todo_id.0, "todo updated");
                Outcome::Applied
            }
            Err(source) => {
                inner.record_failure(OperationError::Update { source }, Some(todo_id));
                Outcome::Failed
            }
        }
    }

    /// Deletes a todo after the user confirms. Declining is not an error.
    pub async fn delete(&self, todo_id: TodoId) -> Outcome {
        let Some(target) = self.get(todo_id).await else {
            debug!(todo_id = todo_id.0, "delete target is not in the list");
            return Outcome::Vanished;
        };

        if !self.confirmation.confirm_delete(&target).await {
            info!(todo_id = todo_id.0, "delete declined");
            return Outcome::Declined;
        }

        {
            let mut inner = self.inner.lock().await;
            if !inner.contains(todo_id) {
                debug!(todo_id = todo_id.0, "todo vanished while confirming delete");
                return Outcome::Vanished;
            }
            inner.begin_mutation(todo_id, MutationKind::Delete);
        }

        let result = self.remote.delete(todo_id).await;

        let mut inner = self.inner.lock().await;
        inner.end_mutation(todo_id);
        match result {
            Ok(()) => match inner.position(todo_id) {
                Some(index) => {
                    inner.todos.remove(index);
                    inner.pending.remove(&todo_id);
                    info!(todo_id = todo_id.0, "todo deleted");
                    Outcome::Applied
                }
                None => Outcome::Vanished,
            },
            Err(source) if !inner.contains(todo_id) => {
                warn!(
                    todo_id = todo_id.0,
                    error = %format!("{source:#}"),
                    "delete failed for a todo that already left the list"
                );
                Outcome::Vanished
            }
            Err(source) => {
                inner.record_failure(OperationError::Delete { source }, Some(todo_id));
                Outcome::Failed
            }
        }
    }

    pub async fn dismiss_error(&self) {
        self.inner.lock().await.error = None;
    }

    pub async fn error(&self) -> Option<ErrorState> {
        self.inner.lock().await.error.clone()
    }

    pub async fn todos(&self) -> Vec<Todo> {
        self.inner.lock().await.todos.clone()
    }

    pub async fn get(&self, todo_id: TodoId) -> Option<Todo> {
        let inner = self.inner.lock().await;
        inner.position(todo_id).map(|index| inner.todos[index].clone())
    }

    pub async fn is_busy(&self, todo_id: TodoId) -> bool {
        self.inner.lock().await.pending.contains_key(&todo_id)
    }

    pub async fn counts(&self) -> TodoCounts {
        TodoCounts::tally(&self.inner.lock().await.todos)
    }

    pub async fn snapshot(&self) -> ListSnapshot {
        self.inner.lock().await.snapshot()
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
