//! Todo resource operations, independent of the HTTP layer.

use shared::{
    domain::{Todo, TodoId},
    error::{ApiError, ErrorCode},
    protocol::{ListTodosQuery, TodoCreate, TodoUpdate},
};
use storage::Storage;
use tracing::{error, info};

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
}

pub fn todos_route() -> &'static str {
    "/api/todos"
}

pub fn todo_route() -> &'static str {
    "/api/todos/:todo_id"
}

pub async fn list_todos(ctx: &ApiContext, query: ListTodosQuery) -> Result<Vec<Todo>, ApiError> {
    ctx.storage
        .list_todos(query.skip, query.limit)
        .await
        .map_err(internal)
}

pub async fn get_todo(ctx: &ApiContext, todo_id: TodoId) -> Result<Todo, ApiError> {
    ctx.storage
        .get_todo(todo_id)
        .await
        .map_err(internal)?
        .ok_or_else(ApiError::not_found)
}

pub async fn create_todo(ctx: &ApiContext, todo: TodoCreate) -> Result<Todo, ApiError> {
    let todo = TodoCreate {
        title: required_title(&todo.title)?,
        description: todo.description,
        completed: todo.completed,
    };
    let created = ctx.storage.create_todo(&todo).await.map_err(internal)?;
    info!(todo_id = created.id.0, "todo created");
    Ok(created)
}

pub async fn update_todo(
    ctx: &ApiContext,
    todo_id: TodoId,
    mut update: TodoUpdate,
) -> Result<Todo, ApiError> {
    if let Some(title) = update.title.as_deref() {
        update.title = Some(required_title(title)?);
    }
    let updated = ctx
        .storage
        .update_todo(todo_id, &update)
        .await
        .map_err(internal)?
        .ok_or_else(ApiError::not_found)?;
    info!(todo_id = todo_id.0, "todo updated");
    Ok(updated)
}

pub async fn delete_todo(ctx: &ApiContext, todo_id: TodoId) -> Result<(), ApiError> {
    let removed = ctx.storage.delete_todo(todo_id).await.map_err(internal)?;
    if !removed {
        return Err(ApiError::not_found());
    }
    info!(todo_id = todo_id.0, "todo deleted");
    Ok(())
}

fn required_title(title: &str) -> Result<String, ApiError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ApiError::new(ErrorCode::Validation, "title must not be empty"));
    }
    Ok(title.to_string())
}

fn internal(err: anyhow::Error) -> ApiError {
    error!(error = %format!("{err:#}"), "storage operation failed");
    ApiError::new(ErrorCode::Internal, err.to_string())
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
