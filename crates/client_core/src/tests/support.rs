use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering},
        Arc,
    },
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use shared::{
    domain::{Todo, TodoId},
    protocol::{TodoCreate, TodoUpdate},
};
use tokio::sync::{oneshot, Mutex, Notify};

use crate::{
    controller::ListController,
    remote::{DeleteConfirmation, TodoRemote},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Call {
    List,
    Create,
    Update,
    Delete,
}

pub(crate) fn created_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap()
}

pub(crate) fn todo(id: i64, title: &str, completed: bool) -> Todo {
    Todo {
        id: TodoId(id),
        title: title.to_string(),
        description: None,
        completed,
        created_at: created_at(),
        updated_at: None,
    }
}

/// In-memory stand-in for the todo service. Calls can be made to fail, and
/// an update can be parked until the test releases it.
pub(crate) struct FakeRemote {
    store: Mutex<Vec<Todo>>,
    next_id: AtomicI64,
    failing: Mutex<HashSet<Call>>,
    calls: Mutex<Vec<Call>>,
    update_gate: Mutex<Option<oneshot::Receiver<()>>>,
    pub(crate) update_started: Notify,
}

impl FakeRemote {
    pub(crate) fn with_todos(todos: Vec<Todo>) -> Arc<Self> {
        let next_id = todos.iter().map(|todo| todo.id.0).max().unwrap_or(0) + 1;
        Arc::new(Self {
            store: Mutex::new(todos),
            next_id: AtomicI64::new(next_id),
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            update_gate: Mutex::new(None),
            update_started: Notify::new(),
        })
    }

    pub(crate) fn empty() -> Arc<Self> {
        Self::with_todos(Vec::new())
    }

    pub(crate) async fn fail(&self, call: Call) {
        self.failing.lock().await.insert(call);
    }

    pub(crate) async fn recover(&self, call: Call) {
        self.failing.lock().await.remove(&call);
    }

    pub(crate) async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    pub(crate) async fn count(&self, call: Call) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|made| **made == call)
            .count()
    }

    pub(crate) async fn stored(&self) -> Vec<Todo> {
        self.store.lock().await.clone()
    }

    /// The next update computes its response, then waits for the returned
    /// sender to fire before answering.
    pub(crate) async fn hold_next_update(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.update_gate.lock().await = Some(rx);
        tx
    }

    async fn enter(&self, call: Call) -> Result<()> {
        self.calls.lock().await.push(call);
        if self.failing.lock().await.contains(&call) {
            return Err(anyhow!("simulated network error during {call:?}"));
        }
        Ok(())
    }
}

#[async_trait]
impl TodoRemote for FakeRemote {
    async fn list(&self) -> Result<Vec<Todo>> {
        self.enter(Call::List).await?;
        Ok(self.store.lock().await.clone())
    }

    async fn create(&self, todo: TodoCreate) -> Result<Todo> {
        self.enter(Call::Create).await?;
        let created = Todo {
            id: TodoId(self.next_id.fetch_add(1, Ordering::SeqCst)),
            title: todo.title,
            description: todo.description,
            completed: todo.completed,
            created_at: created_at(),
            updated_at: None,
        };
        self.store.lock().await.push(created.clone());
        Ok(created)
    }

    async fn update(&self, todo_id: TodoId, update: TodoUpdate) -> Result<Todo> {
        self.enter(Call::Update).await?;
        let updated = {
            let mut store = self.store.lock().await;
            let todo = store
                .iter_mut()
                .find(|todo| todo.id == todo_id)
                .ok_or_else(|| anyhow!("Todo not found"))?;
            if let Some(title) = update.title {
                todo.title = title;
            }
            if let Some(description) = update.description {
                todo.description = Some(description);
            }
            if let Some(completed) = update.completed {
                todo.completed = completed;
            }
            todo.updated_at = Some(created_at() + chrono::Duration::minutes(5));
            todo.clone()
        };

        self.update_started.notify_one();
        let gate = self.update_gate.lock().await.take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        Ok(updated)
    }

    async fn delete(&self, todo_id: TodoId) -> Result<()> {
        self.enter(Call::Delete).await?;
        let mut store = self.store.lock().await;
        let before = store.len();
        store.retain(|todo| todo.id != todo_id);
        if store.len() == before {
            return Err(anyhow!("Todo not found"));
        }
        Ok(())
    }
}

pub(crate) struct ScriptedConfirmation {
    answer: AtomicBool,
    asked: AtomicUsize,
}

impl ScriptedConfirmation {
    pub(crate) fn answering(answer: bool) -> Arc<Self> {
        Arc::new(Self {
            answer: AtomicBool::new(answer),
            asked: AtomicUsize::new(0),
        })
    }

    pub(crate) fn set_answer(&self, answer: bool) {
        self.answer.store(answer, Ordering::SeqCst);
    }

    pub(crate) fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeleteConfirmation for ScriptedConfirmation {
    async fn confirm_delete(&self, _todo: &Todo) -> bool {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.answer.load(Ordering::SeqCst)
    }
}

pub(crate) fn controller_for(
    remote: &Arc<FakeRemote>,
    confirmation: &Arc<ScriptedConfirmation>,
) -> ListController {
    ListController::new(remote.clone(), confirmation.clone())
}
