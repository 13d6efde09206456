use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use shared::{
    domain::RecordId,
    error::ApiError,
    protocol::{LoginRequest, LoginSession},
    resource::{Carts, Comments, Posts, Products, Todos, Users},
};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod config;

use api::{ApiContext, Rejection, Seeded, DEFAULT_LIMIT};
use config::load_settings;

const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
struct AppState {
    api: ApiContext,
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    limit: Option<u32>,
    skip: Option<u32>,
}

type HttpResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings();
    let state = AppState {
        api: ApiContext::seeded(settings.seed_per_collection),
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.bind_addr.parse()?;
    info!(
        %addr,
        seed_per_collection = settings.seed_per_collection,
        "mock api listening"
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/auth/login", post(login))
        .merge(collection_routes::<Users>())
        .merge(collection_routes::<Products>())
        .merge(collection_routes::<Carts>())
        .merge(collection_routes::<Posts>())
        .merge(collection_routes::<Comments>())
        .merge(collection_routes::<Todos>())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

fn collection_routes<R: Seeded>() -> Router<Arc<AppState>> {
    let base = format!("/{}", R::KIND.collection());
    Router::new()
        .route(&base, get(list_records::<R>))
        .route(&format!("{base}/add"), post(add_record::<R>))
        .route(
            &format!("{base}/:id"),
            put(update_record::<R>).delete(delete_record::<R>),
        )
}

fn reject(rejection: Rejection) -> (StatusCode, Json<ApiError>) {
    let status = rejection.status();
    let body = rejection.into_body();
    warn!(status = status.as_u16(), message = %body.message, "request rejected");
    (status, Json(body))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn list_records<R: Seeded>(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> HttpResult<Value> {
    let body = api::list_records::<R>(
        &state.api,
        q.limit.unwrap_or(DEFAULT_LIMIT),
        q.skip.unwrap_or(0),
    )
    .await
    .map_err(reject)?;
    Ok(Json(body))
}

async fn add_record<R: Seeded>(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> HttpResult<R::Record> {
    let record = api::add_record::<R>(&state.api, body)
        .await
        .map_err(reject)?;
    Ok(Json(record))
}

async fn update_record<R: Seeded>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(patch): Json<Value>,
) -> HttpResult<R::Record> {
    let record = api::update_record::<R>(&state.api, RecordId(id), patch)
        .await
        .map_err(reject)?;
    Ok(Json(record))
}

async fn delete_record<R: Seeded>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> HttpResult<Value> {
    let body = api::delete_record::<R>(&state.api, RecordId(id))
        .await
        .map_err(reject)?;
    Ok(Json(body))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> HttpResult<LoginSession> {
    let session = api::login(&state.api, &req).await.map_err(reject)?;
    Ok(Json(session))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
