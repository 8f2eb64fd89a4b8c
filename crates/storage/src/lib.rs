use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::{
    domain::{Todo, TodoId},
    protocol::{TodoCreate, TodoUpdate},
};

const TODO_COLUMNS: &str = "id, title, description, completed, created_at, updated_at";

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // An in-memory database lives and dies with its connection.
        let max_connections = if database_url.starts_with("sqlite::memory:") {
            1
        } else {
            5
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;
        let storage = Self { pool };
        storage.ensure_todos_table().await?;
        Ok(storage)
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    async fn ensure_todos_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS todos (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                title       TEXT NOT NULL,
                description TEXT,
                completed   INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL,
                updated_at  TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure todos table exists")?;
        Ok(())
    }

    pub async fn list_todos(&self, skip: u32, limit: u32) -> Result<Vec<Todo>> {
        let rows = sqlx::query(&format!(
            "SELECT {TODO_COLUMNS} FROM todos ORDER BY id ASC LIMIT ? OFFSET ?"
        ))
        .bind(i64::from(limit))
        .bind(i64::from(skip))
        .fetch_all(&self.pool)
        .await
        .context("failed to list todos")?;
        rows.iter().map(todo_from_row).collect()
    }

    pub async fn get_todo(&self, todo_id: TodoId) -> Result<Option<Todo>> {
        let row = sqlx::query(&format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = ?"))
            .bind(todo_id.0)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to load todo {todo_id}"))?;
        row.as_ref().map(todo_from_row).transpose()
    }

    pub async fn create_todo(&self, todo: &TodoCreate) -> Result<Todo> {
        let row = sqlx::query(&format!(
            "INSERT INTO todos (title, description, completed, created_at)
             VALUES (?, ?, ?, ?)
             RETURNING {TODO_COLUMNS}"
        ))
        .bind(&todo.title)
        .bind(&todo.description)
        .bind(todo.completed)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .context("failed to insert todo")?;
        todo_from_row(&row)
    }

    /// Applies only the fields present in `update`. Returns `None` when no
    /// row has `todo_id`.
    pub async fn update_todo(&self, todo_id: TodoId, update: &TodoUpdate) -> Result<Option<Todo>> {
        let row = sqlx::query(&format!(
            "UPDATE todos SET
                title = COALESCE(?, title),
                description = COALESCE(?, description),
                completed = COALESCE(?, completed),
                updated_at = ?
             WHERE id = ?
             RETURNING {TODO_COLUMNS}"
        ))
        .bind(&update.title)
        .bind(&update.description)
        .bind(update.completed)
        .bind(Utc::now())
        .bind(todo_id.0)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to update todo {todo_id}"))?;
        row.as_ref().map(todo_from_row).transpose()
    }

    /// Returns whether a row was removed.
    pub async fn delete_todo(&self, todo_id: TodoId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM todos WHERE id = ?")
            .bind(todo_id.0)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete todo {todo_id}"))?;
        Ok(result.rows_affected() > 0)
    }
}

fn todo_from_row(row: &SqliteRow) -> Result<Todo> {
    Ok(Todo {
        id: TodoId(row.try_get("id")?),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        completed: row.try_get("completed")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<Option<DateTime<Utc>>, _>("updated_at")?,
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
