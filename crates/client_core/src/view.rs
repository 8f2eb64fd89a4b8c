//! Plain-text rendering of a list snapshot.

use std::collections::HashMap;

use shared::domain::{Todo, TodoCounts, TodoId};

use crate::{
    controller::ListSnapshot,
    editor::{EditorState, ItemEditor},
};

pub const TITLE: &str = "Todo App";
pub const EMPTY_STATE_MESSAGE: &str = "No todos yet. Add one above to get started!";
pub const LOADING_MESSAGE: &str = "Loading...";

pub fn footer(counts: TodoCounts) -> String {
    format!(
        "Total: {} todos | Completed: {} | Pending: {}",
        counts.total, counts.completed, counts.pending
    )
}

pub fn render_list(snapshot: &ListSnapshot, editors: &HashMap<TodoId, ItemEditor>) -> String {
    let mut lines = vec![TITLE.to_string()];

    if let Some(error) = &snapshot.error {
        lines.push(format!("[!] {}", error.message));
    }
    if snapshot.loading {
        lines.push(LOADING_MESSAGE.to_string());
    }
    if snapshot.creating {
        lines.push("Adding todo...".to_string());
    }

    if snapshot.todos.is_empty() {
        lines.push(EMPTY_STATE_MESSAGE.to_string());
    } else {
        for todo in &snapshot.todos {
            let busy = snapshot.is_busy(todo.id);
            lines.extend(render_item(todo, editors.get(&todo.id), busy));
        }
    }

    lines.push(footer(snapshot.counts()));
    lines.join("\n")
}

pub fn render_item(todo: &Todo, editor: Option<&ItemEditor>, busy: bool) -> Vec<String> {
    let viewing = ItemEditor::new(todo.id);
    let editor = editor.unwrap_or(&viewing);
    let fields = editor.display(todo);

    let marker = match editor.state() {
        EditorState::Editing(_) => "[~]",
        _ if fields.completed => "[x]",
        _ => "[ ]",
    };
    let mut headline = format!("{marker} #{} {}", todo.id, fields.title);
    if busy || editor.is_saving() {
        headline.push_str("  (saving)");
    }

    let mut lines = vec![headline];
    if let Some(description) = fields.description {
        lines.push(format!("      {description}"));
    }
    lines.push(format!(
        "      Created: {}",
        todo.created_at.format("%Y-%m-%d")
    ));
    lines
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
