use std::{collections::BTreeMap, sync::Arc};

use axum::http::StatusCode;
use chrono::Utc;
use serde_json::{Map, Value};
use shared::{
    domain::RecordId,
    error::ApiError,
    protocol::{encode_page, LoginRequest, LoginSession, Page},
    resource::{Carts, Comments, Posts, Products, Resource, Todos, Users},
};
use tokio::sync::RwLock;
use tracing::{debug, info};

mod seed;

pub use seed::Seeded;
use seed::{account_password, account_username};

/// Page size used when a list request carries no `limit`.
pub const DEFAULT_LIMIT: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    BadRequest(ApiError),
    NotFound(ApiError),
}

impl Rejection {
    pub fn status(&self) -> StatusCode {
        match self {
            Rejection::BadRequest(_) => StatusCode::BAD_REQUEST,
            Rejection::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    pub fn into_body(self) -> ApiError {
        match self {
            Rejection::BadRequest(body) | Rejection::NotFound(body) => body,
        }
    }
}

fn bad_request(message: impl Into<String>) -> Rejection {
    Rejection::BadRequest(ApiError::new(message))
}

fn not_found<R: Resource>(id: RecordId) -> Rejection {
    Rejection::NotFound(ApiError::not_found(R::KIND.label(), id.0))
}

/// In-memory records of one collection, ordered by id.
pub struct Collection<R: Resource> {
    records: BTreeMap<RecordId, R::Record>,
    next_id: i64,
}

impl<R: Seeded> Collection<R> {
    pub fn seeded(count: u32) -> Self {
        let records = (1..=i64::from(count))
            .map(|n| {
                let mut record = R::seed(n);
                R::finalize(&mut record);
                (RecordId(n), record)
            })
            .collect();
        Self {
            records,
            next_id: i64::from(count) + 1,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn get(&self, id: RecordId) -> Option<&R::Record> {
        self.records.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &R::Record> {
        self.records.values()
    }

    /// `limit == 0` returns every record from `skip` on.
    pub fn page(&self, limit: u32, skip: u32) -> Page<R::Record> {
        let take = if limit == 0 { usize::MAX } else { limit as usize };
        let records: Vec<R::Record> = self
            .records
            .values()
            .skip(skip as usize)
            .take(take)
            .cloned()
            .collect();
        Page {
            limit: records.len() as u32,
            records,
            total: self.records.len() as u32,
            skip,
        }
    }

    pub fn insert(&mut self, draft: &R::Draft) -> R::Record {
        let id = RecordId(self.next_id);
        self.next_id += 1;
        let mut record = R::materialize(id, draft);
        R::finalize(&mut record);
        self.records.insert(id, record.clone());
        record
    }

    /// Merges the fields present in `patch` over the stored record.
    pub fn update(&mut self, id: RecordId, patch: Value) -> Result<R::Record, Rejection> {
        let existing = self.get(id).ok_or_else(|| not_found::<R>(id))?;
        let Value::Object(patch) = patch else {
            return Err(bad_request("request body must be a JSON object"));
        };
        let mut merged = match serde_json::to_value(R::to_draft(existing)) {
            Ok(Value::Object(fields)) => fields,
            _ => Map::new(),
        };
        merged.extend(patch);
        let draft = parse_draft::<R>(Value::Object(merged))?;
        R::validate(&draft).map_err(|err| bad_request(err.to_string()))?;

        let mut record = R::apply(existing, &draft);
        R::finalize(&mut record);
        self.records.insert(id, record.clone());
        Ok(record)
    }

    pub fn remove(&mut self, id: RecordId) -> Option<R::Record> {
        self.records.remove(&id)
    }
}

fn parse_draft<R: Resource>(body: Value) -> Result<R::Draft, Rejection> {
    serde_json::from_value(body).map_err(|err| {
        bad_request(format!(
            "invalid {} body: {err}",
            R::KIND.label().to_ascii_lowercase()
        ))
    })
}

struct Collections {
    users: RwLock<Collection<Users>>,
    products: RwLock<Collection<Products>>,
    carts: RwLock<Collection<Carts>>,
    posts: RwLock<Collection<Posts>>,
    comments: RwLock<Collection<Comments>>,
    todos: RwLock<Collection<Todos>>,
}

#[derive(Clone)]
pub struct ApiContext {
    collections: Arc<Collections>,
}

impl ApiContext {
    pub fn seeded(per_collection: u32) -> Self {
        Self {
            collections: Arc::new(Collections {
                users: RwLock::new(Collection::seeded(per_collection)),
                products: RwLock::new(Collection::seeded(per_collection)),
                carts: RwLock::new(Collection::seeded(per_collection)),
                posts: RwLock::new(Collection::seeded(per_collection)),
                comments: RwLock::new(Collection::seeded(per_collection)),
                todos: RwLock::new(Collection::seeded(per_collection)),
            }),
        }
    }

    pub fn users(&self) -> &RwLock<Collection<Users>> {
        &self.collections.users
    }

    pub fn products(&self) -> &RwLock<Collection<Products>> {
        &self.collections.products
    }

    pub fn carts(&self) -> &RwLock<Collection<Carts>> {
        &self.collections.carts
    }

    pub fn posts(&self) -> &RwLock<Collection<Posts>> {
        &self.collections.posts
    }

    pub fn comments(&self) -> &RwLock<Collection<Comments>> {
        &self.collections.comments
    }

    pub fn todos(&self) -> &RwLock<Collection<Todos>> {
        &self.collections.todos
    }
}

pub async fn list_records<R: Seeded>(
    ctx: &ApiContext,
    limit: u32,
    skip: u32,
) -> Result<Value, Rejection> {
    let page = R::collection(ctx).read().await.page(limit, skip);
    debug!(
        "api: list collection={} skip={skip} returned={} total={}",
        R::KIND.collection(),
        page.records.len(),
        page.total
    );
    encode_page(R::KIND.collection(), &page).map_err(|err| bad_request(err.to_string()))
}

pub async fn add_record<R: Seeded>(ctx: &ApiContext, body: Value) -> Result<R::Record, Rejection> {
    let draft = parse_draft::<R>(body)?;
    R::validate(&draft).map_err(|err| bad_request(err.to_string()))?;
    let record = R::collection(ctx).write().await.insert(&draft);
    info!(
        "api: record added collection={} id={}",
        R::KIND.collection(),
        R::id(&record)
    );
    Ok(record)
}

pub async fn update_record<R: Seeded>(
    ctx: &ApiContext,
    id: RecordId,
    patch: Value,
) -> Result<R::Record, Rejection> {
    let record = R::collection(ctx).write().await.update(id, patch)?;
    info!(
        "api: record updated collection={} id={id}",
        R::KIND.collection()
    );
    Ok(record)
}

/// Removes `id` and answers with the deleted record flagged `isDeleted`.
pub async fn delete_record<R: Seeded>(ctx: &ApiContext, id: RecordId) -> Result<Value, Rejection> {
    let record = R::collection(ctx)
        .write()
        .await
        .remove(id)
        .ok_or_else(|| not_found::<R>(id))?;
    info!(
        "api: record deleted collection={} id={id}",
        R::KIND.collection()
    );

    let mut body = match serde_json::to_value(&record) {
        Ok(Value::Object(fields)) => fields,
        _ => Map::new(),
    };
    body.insert("isDeleted".into(), Value::Bool(true));
    body.insert("deletedOn".into(), Value::String(Utc::now().to_rfc3339()));
    Ok(Value::Object(body))
}

pub async fn login(ctx: &ApiContext, req: &LoginRequest) -> Result<LoginSession, Rejection> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(bad_request("Username and password required"));
    }
    let users = ctx.users().read().await;
    let user = users
        .iter()
        .find(|user| account_username(user) == req.username)
        .filter(|user| account_password(user) == req.password)
        .ok_or_else(|| bad_request("Invalid credentials"))?;

    let issued = Utc::now().timestamp();
    info!("api: login username={} id={}", req.username, user.id);
    Ok(LoginSession {
        id: user.id.0,
        username: req.username.clone(),
        email: Some(user.email.clone()),
        first_name: Some(user.first_name.clone()),
        last_name: Some(user.last_name.clone()),
        gender: Some(user.gender.clone()),
        image: None,
        access_token: Some(format!("mock-access-{}-{issued}", user.id)),
        refresh_token: Some(format!("mock-refresh-{}-{issued}", user.id)),
    })
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
