use std::sync::Arc;

use super::*;
use crate::test_support::todo;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use shared::error::ErrorCode;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct ServerState {
    received_updates: Arc<Mutex<Vec<serde_json::Value>>>,
    received_creates: Arc<Mutex<Vec<serde_json::Value>>>,
}

async fn handle_list() -> Json<Vec<Todo>> {
    Json(vec![todo(1, "Buy milk", false)])
}

async fn handle_create(
    State(state): State<ServerState>,
    Json(payload): Json<serde_json::Value>,
) -> (StatusCode, Json<Todo>) {
    state.received_creates.lock().await.push(payload);
    (StatusCode::CREATED, Json(todo(2, "Call mom", false)))
}

async fn handle_update(
    State(state): State<ServerState>,
    Path(todo_id): Path<i64>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<Todo>, (StatusCode, Json<ApiError>)> {
    if todo_id != 1 {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ApiError::new(ErrorCode::NotFound, "Todo not found")),
        ));
    }
    state.received_updates.lock().await.push(payload);
    Ok(Json(todo(1, "Buy milk", true)))
}

async fn handle_delete(Path(todo_id): Path<i64>) -> StatusCode {
    if todo_id == 1 {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

async fn spawn_todo_server() -> anyhow::Result<(String, ServerState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = ServerState::default();
    let app = Router::new()
        .route("/api/todos", get(handle_list).post(handle_create))
        .route("/api/todos/:todo_id", put(handle_update).delete(handle_delete))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}/api"), state))
}

#[test]
fn base_url_gains_trailing_slash_so_joins_keep_the_prefix() {
    let remote = HttpTodoRemote::new("http://localhost:8000/api").expect("remote");
    assert_eq!(remote.base_url().as_str(), "http://localhost:8000/api/");
    assert_eq!(
        remote.item_url(TodoId(7)).expect("url").as_str(),
        "http://localhost:8000/api/todos/7"
    );
}

#[test]
fn invalid_base_url_is_rejected() {
    assert!(HttpTodoRemote::new("not a url").is_err());
    assert!(HttpTodoRemote::new("mailto:someone@example.com").is_err());
}

#[tokio::test]
async fn list_create_update_delete_over_http() {
    let (server_url, state) = spawn_todo_server().await.expect("spawn server");
    let remote = HttpTodoRemote::with_timeout(&server_url, Some(Duration::from_secs(5)))
        .expect("remote");

    let listed = remote.list().await.expect("list");
    assert_eq!(listed, vec![todo(1, "Buy milk", false)]);

    let created = remote
        .create(TodoCreate {
            title: "Call mom".into(),
            description: None,
            completed: false,
        })
        .await
        .expect("create");
    assert_eq!(created.id, TodoId(2));

    let updated = remote
        .update(TodoId(1), TodoUpdate::completed(true))
        .await
        .expect("update");
    assert!(updated.completed);

    remote.delete(TodoId(1)).await.expect("delete");

    assert_eq!(
        state.received_creates.lock().await.as_slice(),
        [serde_json::json!({ "title": "Call mom", "completed": false })]
    );
    assert_eq!(
        state.received_updates.lock().await.as_slice(),
        [serde_json::json!({ "completed": true })]
    );
}

#[tokio::test]
async fn error_status_carries_service_error_body() {
    let (server_url, _state) = spawn_todo_server().await.expect("spawn server");
    let remote = HttpTodoRemote::new(&server_url).expect("remote");

    let err = remote
        .update(TodoId(9), TodoUpdate::completed(true))
        .await
        .expect_err("must fail");
    let exception = err
        .downcast_ref::<ApiException>()
        .expect("api exception in chain");
    assert_eq!(exception.code, ErrorCode::NotFound);
    assert!(format!("{err:#}").contains("404"));

    let err = remote.delete(TodoId(9)).await.expect_err("must fail");
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn unreachable_server_is_an_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let remote = HttpTodoRemote::new(&format!("http://{addr}/api")).expect("remote");
    assert!(remote.list().await.is_err());
}
