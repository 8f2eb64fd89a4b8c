use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderValue, Method, StatusCode},
    routing::get,
    Json, Router,
};
use shared::{
    domain::{Todo, TodoId},
    error::{ApiError, ErrorCode},
    protocol::{HealthResponse, ListTodosQuery, TodoCreate, TodoUpdate, WelcomeResponse},
};
use storage::Storage;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod api;
mod app_state;
mod config;

use api::{create_todo, delete_todo, get_todo, list_todos, update_todo, ApiContext};
use app_state::AppState;
use config::{load_settings, prepare_database_url};

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    let state = AppState {
        api: ApiContext { storage },
    };
    let app = build_router(Arc::new(state))
        .layer(cors_layer(&settings.cors_origin)?)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, cors_origin = %settings.cors_origin, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route(api::todos_route(), get(http_list_todos).post(http_create_todo))
        .route(
            &format!("{}/", api::todos_route()),
            get(http_list_todos).post(http_create_todo),
        )
        .route(
            api::todo_route(),
            get(http_get_todo)
                .put(http_update_todo)
                .delete(http_delete_todo),
        )
        .with_state(state)
}

fn cors_layer(origin: &str) -> anyhow::Result<CorsLayer> {
    let origin: HeaderValue = origin
        .parse()
        .with_context(|| format!("invalid CORS origin '{origin}'"))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any))
}

fn status_for(code: &ErrorCode) -> StatusCode {
    match code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reject(err: ApiError) -> (StatusCode, Json<ApiError>) {
    (status_for(&err.code), Json(err))
}

async fn root() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Welcome to Todo API".to_string(),
    })
}

async fn health(State(state): State<Arc<AppState>>) -> ApiResult<Json<HealthResponse>> {
    state.api.storage.health_check().await.map_err(|e| {
        error!(error = %e, "health check failed");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiError::new(ErrorCode::Internal, e.to_string())),
        )
    })?;
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
    }))
}

async fn http_list_todos(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListTodosQuery>,
) -> ApiResult<Json<Vec<Todo>>> {
    list_todos(&state.api, query).await.map(Json).map_err(reject)
}

async fn http_get_todo(
    State(state): State<Arc<AppState>>,
    Path(todo_id): Path<i64>,
) -> ApiResult<Json<Todo>> {
    get_todo(&state.api, TodoId(todo_id))
        .await
        .map(Json)
        .map_err(reject)
}

async fn http_create_todo(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TodoCreate>,
) -> ApiResult<(StatusCode, Json<Todo>)> {
    let todo = create_todo(&state.api, req).await.map_err(reject)?;
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn http_update_todo(
    State(state): State<Arc<AppState>>,
    Path(todo_id): Path<i64>,
    Json(req): Json<TodoUpdate>,
) -> ApiResult<Json<Todo>> {
    update_todo(&state.api, TodoId(todo_id), req)
        .await
        .map(Json)
        .map_err(reject)
}

async fn http_delete_todo(
    State(state): State<Arc<AppState>>,
    Path(todo_id): Path<i64>,
) -> ApiResult<StatusCode> {
    delete_todo(&state.api, TodoId(todo_id))
        .await
        .map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
