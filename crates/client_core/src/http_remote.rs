use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use shared::{
    domain::{Todo, TodoId},
    error::{ApiError, ApiException},
    protocol::{TodoCreate, TodoUpdate},
};
use tracing::debug;
use url::Url;

use crate::remote::TodoRemote;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api";

/// `TodoRemote` backed by the todo service's `/todos` resource.
pub struct HttpTodoRemote {
    http: Client,
    base_url: Url,
}

impl HttpTodoRemote {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, None)
    }

    pub fn with_timeout(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("failed to build http client")?;
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn collection_url(&self) -> Result<Url> {
        self.base_url
            .join("todos")
            .context("failed to build todos url")
    }

    fn item_url(&self, todo_id: TodoId) -> Result<Url> {
        self.base_url
            .join(&format!("todos/{todo_id}"))
            .with_context(|| format!("failed to build url for todo {todo_id}"))
    }
}

/// Relative joins replace the last path segment unless the base ends in a
/// slash, so `/api` becomes `/api/`.
fn normalize_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim()).with_context(|| format!("invalid server url '{raw}'"))?;
    if url.cannot_be_a_base() {
        bail!("server url '{raw}' cannot be used as a base url");
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ApiError>(&body) {
        Ok(api_error) => Err(ApiException::from(api_error))
            .with_context(|| format!("todo service responded with {status}")),
        Err(_) => Err(anyhow!("todo service responded with {status}: {body}")),
    }
}

#[async_trait]
impl TodoRemote for HttpTodoRemote {
    async fn list(&self) -> Result<Vec<Todo>> {
        let url = self.collection_url()?;
        debug!(%url, "listing todos");
        let response = self.http.get(url).send().await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    async fn create(&self, todo: TodoCreate) -> Result<Todo> {
        let url = self.collection_url()?;
        debug!(%url, "creating todo");
        let response = self.http.post(url).json(&todo).send().await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    async fn update(&self, todo_id: TodoId, update: TodoUpdate) -> Result<Todo> {
        let url = self.item_url(todo_id)?;
        debug!(%url, "updating todo");
        let response = self.http.put(url).json(&update).send().await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    async fn delete(&self, todo_id: TodoId) -> Result<()> {
        let url = self.item_url(todo_id)?;
        debug!(%url, "deleting todo");
        let response = self.http.delete(url).send().await?;
        ensure_success(response).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/http_remote_tests.rs"]
mod tests;
