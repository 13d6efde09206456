use super::*;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use shared::{
    domain::RecordId,
    error::ApiError,
    protocol::{LoginRequest, PageQuery},
};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct ServerState {
    queries: Arc<Mutex<Vec<PageQuery>>>,
    deleted: Arc<Mutex<Vec<i64>>>,
}

async fn list_todos(
    State(state): State<ServerState>,
    Query(query): Query<PageQuery>,
) -> Json<Value> {
    state.queries.lock().await.push(query);
    let todos: Vec<Value> = (query.skip + 1..=(query.skip + query.limit).min(12))
        .map(|id| json!({ "id": id, "todo": format!("todo {id}"), "completed": id % 2 == 0, "userId": 1 }))
        .collect();
    Json(json!({ "todos": todos, "total": 12, "skip": query.skip, "limit": query.limit }))
}

async fn delete_todo(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, (StatusCode, Json<ApiError>)> {
    let mut deleted = state.deleted.lock().await;
    if deleted.contains(&id) || id > 12 {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ApiError::not_found("Todo", id)),
        ));
    }
    deleted.push(id);
    Ok(Json(json!({ "id": id, "isDeleted": true })))
}

async fn login(
    Json(req): Json<LoginRequest>,
) -> Result<Json<Value>, (StatusCode, Json<ApiError>)> {
    if req.username != "emilys" || req.password != "emilyspass" {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::new("Invalid credentials")),
        ));
    }
    Ok(Json(json!({
        "id": 1,
        "username": "emilys",
        "email": "emily.johnson@x.dummyjson.com",
        "firstName": "Emily",
        "accessToken": "token-abc"
    })))
}

async fn spawn_api_server(prefix: &str) -> anyhow::Result<(String, ServerState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = ServerState::default();
    let routes = Router::new()
        .route("/todos", get(list_todos))
        .route("/todos/:id", delete(delete_todo))
        .route("/auth/login", post(login));
    let routes = if prefix.is_empty() {
        routes
    } else {
        Router::new().nest(prefix, routes)
    };
    let app = routes.with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}{prefix}"), state))
}

fn dashboard_for(server_url: &str) -> Dashboard {
    Dashboard::connect(&ClientSettings {
        api_base_url: server_url.to_string(),
        page_size: 5,
        refetch_after_mutation: false,
    })
    .expect("dashboard")
}

#[tokio::test]
async fn http_transport_pages_with_limit_and_skip() {
    let (server_url, state) = spawn_api_server("").await.expect("spawn server");
    let dashboard = dashboard_for(&server_url);

    dashboard.todos.refresh().await.expect("page 1");
    assert_eq!(dashboard.todos.total_pages().await, 3);
    assert!(dashboard.todos.set_page(3).await.expect("page 3"));

    let ids: Vec<i64> = dashboard
        .todos
        .view()
        .await
        .iter()
        .map(|todo| todo.id.0)
        .collect();
    assert_eq!(ids, vec![11, 12]);
    assert_eq!(
        *state.queries.lock().await,
        vec![PageQuery { limit: 5, skip: 0 }, PageQuery { limit: 5, skip: 10 }]
    );
}

#[tokio::test]
async fn base_url_path_prefix_is_kept() {
    let (server_url, _state) = spawn_api_server("/api").await.expect("spawn server");
    let transport = HttpTransport::new(&server_url).expect("transport");
    assert!(transport.base_url().as_str().ends_with("/api/"));

    let body = transport
        .list("todos", PageQuery { limit: 2, skip: 0 })
        .await
        .expect("list");
    assert_eq!(body["total"], 12);
    assert_eq!(body["todos"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn server_error_message_is_surfaced_verbatim() {
    let (server_url, _state) = spawn_api_server("").await.expect("spawn server");
    let dashboard = dashboard_for(&server_url);
    dashboard.todos.refresh().await.expect("page");

    dashboard.todos.remove(RecordId(4)).await.expect("first delete");
    let err = dashboard
        .todos
        .remove(RecordId(4))
        .await
        .expect_err("second delete");

    assert_eq!(
        err,
        ControllerError::Request(RequestError::Status {
            status: 404,
            message: Some("Todo with id '4' not found".into()),
        })
    );
    assert_eq!(
        dashboard.todos.error_message().await.as_deref(),
        Some("Todo with id '4' not found")
    );
}

#[tokio::test]
async fn login_returns_session_and_reports_rejections() {
    let (server_url, _state) = spawn_api_server("").await.expect("spawn server");
    let dashboard = dashboard_for(&server_url);

    let err = dashboard
        .auth
        .login("emilys", "wrong")
        .await
        .expect_err("bad password");
    assert!(matches!(err, ControllerError::Request(RequestError::Status { status: 400, .. })));
    assert_eq!(
        dashboard.auth.error_message().await.as_deref(),
        Some("Invalid credentials")
    );
    assert_eq!(dashboard.auth.credentials().await.username, "emilys");

    let session = dashboard
        .auth
        .login("emilys", "emilyspass")
        .await
        .expect("login");
    assert_eq!(session.id, 1);
    assert_eq!(session.access_token.as_deref(), Some("token-abc"));
    assert_eq!(session.last_name, None);
    assert_eq!(dashboard.auth.error_message().await, None);
    assert_eq!(
        dashboard.auth.success_message().await.as_deref(),
        Some("signed in as emilys")
    );
    assert_eq!(dashboard.auth.credentials().await, LoginRequest::default());
}

#[tokio::test]
async fn login_with_blank_password_is_rejected_locally() {
    // Nothing listens on port 9; a request would fail with a transport error.
    let dashboard = dashboard_for("http://127.0.0.1:9");

    let err = dashboard
        .auth
        .login("emilys", "")
        .await
        .expect_err("missing password");

    assert!(matches!(err, ControllerError::Validation(_)));
    assert_eq!(
        dashboard.auth.error_message().await.as_deref(),
        Some("password is required")
    );
}

#[tokio::test]
async fn refresh_all_reports_collections_that_failed() {
    let (server_url, _state) = spawn_api_server("").await.expect("spawn server");
    let dashboard = dashboard_for(&server_url);

    let failures = dashboard.refresh_all().await;
    let kinds: Vec<ResourceKind> = failures.iter().map(|(kind, _)| *kind).collect();

    assert_eq!(
        kinds,
        vec![
            ResourceKind::Users,
            ResourceKind::Products,
            ResourceKind::Carts,
            ResourceKind::Posts,
            ResourceKind::Comments,
        ]
    );
    assert_eq!(dashboard.todos.view().await.len(), 5);
    assert!(dashboard.users.error_message().await.is_some());
}

#[test]
fn invalid_base_url_is_a_transport_error() {
    let err = HttpTransport::new("not a url").err().expect("invalid url");
    assert!(matches!(err, RequestError::Transport(_)));
}
