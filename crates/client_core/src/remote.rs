use anyhow::Result;
use async_trait::async_trait;
use shared::{
    domain::{Todo, TodoId},
    protocol::{TodoCreate, TodoUpdate},
};

/// The service that owns todos. Every call is one round trip and either
/// fully succeeds or fails with an opaque error.
#[async_trait]
pub trait TodoRemote: Send + Sync {
    async fn list(&self) -> Result<Vec<Todo>>;
    async fn create(&self, todo: TodoCreate) -> Result<Todo>;
    async fn update(&self, todo_id: TodoId, update: TodoUpdate) -> Result<Todo>;
    async fn delete(&self, todo_id: TodoId) -> Result<()>;
}

/// Asked before any delete reaches the remote. Returning `false` aborts the
/// delete without touching the list or the error banner.
#[async_trait]
pub trait DeleteConfirmation: Send + Sync {
    async fn confirm_delete(&self, todo: &Todo) -> bool;
}
