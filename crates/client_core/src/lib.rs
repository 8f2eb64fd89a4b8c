//! Client-side core of the todo list: the authoritative local copy of the
//! list, the per-item edit state machine, and the remote seam they use.

pub mod controller;
pub mod editor;
pub mod error;
pub mod http_remote;
pub mod remote;
pub mod view;

pub use controller::{ListController, ListSnapshot, MutationKind, NewTodo, Outcome, PendingMutation};
pub use editor::{Controls, DisplayFields, EditBuffer, EditorState, ItemEditor, SaveKind};
pub use error::{ErrorState, OperationError, OperationKind};
pub use http_remote::{HttpTodoRemote, DEFAULT_API_BASE_URL};
pub use remote::{DeleteConfirmation, TodoRemote};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
