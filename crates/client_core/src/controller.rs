use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use shared::{
    domain::{RecordId, ResourceKind, User},
    protocol::{decode_page, response_id, Page, PageQuery},
    resource::{Resource, Users},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{
    error::{ControllerError, RequestError, Result},
    store::{RecordStore, ViewEntry},
    transport::ApiTransport,
};

pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerOptions {
    pub page_size: u32,
    /// Reset to page 1 and refetch after every successful mutation.
    pub refetch_after_mutation: bool,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            refetch_after_mutation: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u32,
    pub page_size: u32,
}

impl PageWindow {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    pub fn offset(&self) -> u32 {
        (self.page - 1) * self.page_size
    }

    pub fn query(&self) -> PageQuery {
        PageQuery {
            limit: self.page_size,
            skip: self.offset(),
        }
    }
}

/// Result of a request whose response may arrive after a newer request of the
/// same kind was issued.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Applied(T),
    /// A newer request of the same kind was issued; this response was dropped.
    Superseded,
}

impl<T> Outcome<T> {
    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied(value) => Some(value),
            Outcome::Superseded => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, Outcome::Superseded)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    ViewUpdated { kind: ResourceKind, len: usize },
    Notice { kind: ResourceKind, message: String },
    Error { kind: ResourceKind, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RequestKey {
    Fetch,
    Update(RecordId),
}

/// Everything a presentation layer needs to render one resource screen.
#[derive(Debug, Clone)]
pub struct ControllerSnapshot<R: Resource> {
    pub window: PageWindow,
    pub total: Option<u32>,
    /// Skip and limit the server reported for the last applied page.
    pub served: Option<PageQuery>,
    pub total_pages: u32,
    pub entries: Vec<ViewEntry<R::Record>>,
    pub draft: R::Draft,
    pub editing: Option<RecordId>,
    pub error_message: Option<String>,
    pub success_message: Option<String>,
}

struct ControllerState<R: Resource> {
    window: PageWindow,
    total: Option<u32>,
    served: Option<PageQuery>,
    store: RecordStore<R>,
    draft: R::Draft,
    editing: Option<RecordId>,
    error_message: Option<String>,
    success_message: Option<String>,
    next_seq: u64,
    latest: HashMap<RequestKey, u64>,
}

impl<R: Resource> ControllerState<R> {
    fn issue(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn issue_keyed(&mut self, key: RequestKey) -> u64 {
        let seq = self.issue();
        self.latest.insert(key, seq);
        seq
    }

    fn is_latest(&self, key: RequestKey, seq: u64) -> bool {
        self.latest.get(&key).copied() == Some(seq)
    }

    fn total_pages(&self) -> u32 {
        self.total
            .unwrap_or(0)
            .div_ceil(self.window.page_size.max(1))
    }

    fn fail(&mut self, message: String) {
        self.success_message = None;
        self.error_message = Some(message);
    }

    fn succeed(&mut self, message: String) {
        self.error_message = None;
        self.success_message = Some(message);
    }
}

/// Paginated view of one remote collection with optimistic local writes.
///
/// All methods take `&self`; state sits behind a mutex that is released
/// before any request goes out, so overlapping calls are allowed and resolved
/// by request sequence numbers.
pub struct ResourceController<R: Resource> {
    transport: Arc<dyn ApiTransport>,
    options: ControllerOptions,
    inner: Mutex<ControllerState<R>>,
    events: broadcast::Sender<ControllerEvent>,
}

impl<R: Resource> ResourceController<R> {
    pub fn new(transport: Arc<dyn ApiTransport>, options: ControllerOptions) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            transport,
            options,
            inner: Mutex::new(ControllerState {
                window: PageWindow::new(1, options.page_size),
                total: None,
                served: None,
                store: RecordStore::new(),
                draft: R::Draft::default(),
                editing: None,
                error_message: None,
                success_message: None,
                next_seq: 0,
                latest: HashMap::new(),
            }),
            events,
        })
    }

    pub fn kind(&self) -> ResourceKind {
        R::KIND
    }

    pub fn options(&self) -> ControllerOptions {
        self.options
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub async fn window(&self) -> PageWindow {
        self.inner.lock().await.window
    }

    pub async fn total_pages(&self) -> u32 {
        self.inner.lock().await.total_pages()
    }

    /// The merged view: current page followed by provisional records.
    pub async fn view(&self) -> Vec<R::Record> {
        self.inner.lock().await.store.merged()
    }

    pub async fn get(&self, id: RecordId) -> Option<R::Record> {
        self.inner.lock().await.store.get(id).cloned()
    }

    pub async fn draft(&self) -> R::Draft {
        self.inner.lock().await.draft.clone()
    }

    pub async fn editing(&self) -> Option<RecordId> {
        self.inner.lock().await.editing
    }

    pub async fn error_message(&self) -> Option<String> {
        self.inner.lock().await.error_message.clone()
    }

    pub async fn success_message(&self) -> Option<String> {
        self.inner.lock().await.success_message.clone()
    }

    pub async fn snapshot(&self) -> ControllerSnapshot<R> {
        let state = self.inner.lock().await;
        ControllerSnapshot {
            window: state.window,
            total: state.total,
            served: state.served,
            total_pages: state.total_pages(),
            entries: state.store.merged_entries(),
            draft: state.draft.clone(),
            editing: state.editing,
            error_message: state.error_message.clone(),
            success_message: state.success_message.clone(),
        }
    }

    /// Loads one server page into the view.
    pub async fn fetch(&self, window: PageWindow) -> Result<Outcome<Page<R::Record>>> {
        let seq = self.inner.lock().await.issue_keyed(RequestKey::Fetch);
        let collection = R::KIND.collection();

        let result = match self.transport.list(collection, window.query()).await {
            Ok(body) => decode_page::<R::Record>(collection, body).map_err(RequestError::from),
            Err(err) => Err(err),
        };

        let mut state = self.inner.lock().await;
        if !state.is_latest(RequestKey::Fetch, seq) {
            debug!("controller: dropping superseded page collection={collection} seq={seq}");
            return Ok(Outcome::Superseded);
        }

        match result {
            Ok(page) => {
                state.window = window;
                state.total = Some(page.total);
                state.served = Some(PageQuery {
                    limit: page.limit,
                    skip: page.skip,
                });
                state.store.apply_page(seq, page.records.clone());
                let len = state.store.len();
                info!(
                    "controller: page loaded collection={} page={} skip={} total={} shown={}",
                    collection, window.page, page.skip, page.total, len
                );
                drop(state);
                self.emit(ControllerEvent::ViewUpdated { kind: R::KIND, len });
                Ok(Outcome::Applied(page))
            }
            Err(err) => {
                let message = failure_message(R::KIND, "load", &err);
                warn!("controller: page load failed collection={collection} error={err}");
                state.fail(message.clone());
                drop(state);
                self.emit_error(message);
                Err(err.into())
            }
        }
    }

    /// Refetches the current window.
    pub async fn refresh(&self) -> Result<Outcome<Page<R::Record>>> {
        let window = self.window().await;
        self.fetch(window).await
    }

    /// Moves to page `page` and fetches it. Out-of-range pages are ignored and
    /// reported as `Ok(false)`.
    pub async fn set_page(&self, page: u32) -> Result<bool> {
        let window = {
            let state = self.inner.lock().await;
            let total_pages = state.total_pages();
            if page < 1 || page > total_pages {
                debug!(
                    "controller: ignoring page change collection={} page={page} total_pages={total_pages}",
                    R::KIND.collection()
                );
                return Ok(false);
            }
            // The window only moves once the page has loaded.
            PageWindow {
                page,
                ..state.window
            }
        };
        self.fetch(window).await?;
        Ok(true)
    }

    pub async fn next_page(&self) -> Result<bool> {
        let page = self.window().await.page;
        self.set_page(page.saturating_add(1)).await
    }

    pub async fn previous_page(&self) -> Result<bool> {
        let page = self.window().await.page;
        self.set_page(page.saturating_sub(1)).await
    }

    pub async fn set_draft(&self, draft: R::Draft) {
        self.inner.lock().await.draft = draft;
    }

    /// Selects `id` as the edit target and loads its fields into the draft.
    pub async fn begin_edit(&self, id: RecordId) -> Result<()> {
        let mut state = self.inner.lock().await;
        let Some(record) = state.store.get(id) else {
            let err = ControllerError::NotFound(id);
            state.fail(err.to_string());
            return Err(err);
        };
        state.draft = R::to_draft(record);
        state.editing = Some(id);
        state.error_message = None;
        state.success_message = None;
        Ok(())
    }

    pub async fn cancel_edit(&self) {
        let mut state = self.inner.lock().await;
        state.editing = None;
        state.draft = R::Draft::default();
    }

    /// Creates or updates from the held draft, depending on the edit target.
    pub async fn submit(&self) -> Result<Outcome<R::Record>> {
        let (editing, draft) = {
            let state = self.inner.lock().await;
            (state.editing, state.draft.clone())
        };
        match editing {
            Some(id) => self.update(id, draft).await,
            None => self.create(draft).await,
        }
    }

    pub async fn create(&self, draft: R::Draft) -> Result<Outcome<R::Record>> {
        let (seq, body) = {
            let mut state = self.inner.lock().await;
            state.draft = draft.clone();
            if let Err(err) = R::validate(&draft) {
                state.fail(err.to_string());
                drop(state);
                self.emit_error(err.to_string());
                return Err(err.into());
            }
            let body = serde_json::to_value(&draft).map_err(RequestError::from)?;
            (state.issue(), body)
        };
        let collection = R::KIND.collection();

        let response = match self.transport.create(collection, body).await {
            Ok(response) => response,
            Err(err) => return Err(self.request_failed("add", err).await),
        };

        let mut state = self.inner.lock().await;
        let id = match response_id(&response) {
            Some(id) if !state.store.contains(id) => id,
            Some(id) => {
                let fallback = state.store.fallback_id(Utc::now().timestamp_micros());
                warn!(
                    "controller: server id already in view collection={collection} id={id} fallback={fallback}"
                );
                fallback
            }
            None => state.store.fallback_id(Utc::now().timestamp_micros()),
        };
        let record = R::materialize(id, &draft);
        state.store.insert_provisional(seq, record.clone());
        state.draft = R::Draft::default();
        let message = format!("{} added", R::KIND.label());
        state.succeed(message.clone());
        let len = state.store.len();
        drop(state);

        info!("controller: record added collection={collection} id={id}");
        self.emit(ControllerEvent::Notice {
            kind: R::KIND,
            message,
        });
        self.emit(ControllerEvent::ViewUpdated { kind: R::KIND, len });
        self.after_mutation().await;
        Ok(Outcome::Applied(record))
    }

    /// Sends an update for the record currently selected with [`Self::begin_edit`].
    pub async fn update(&self, id: RecordId, draft: R::Draft) -> Result<Outcome<R::Record>> {
        let (seq, body) = {
            let mut state = self.inner.lock().await;
            if state.editing != Some(id) {
                let err = ControllerError::NoEditTarget;
                state.fail(err.to_string());
                drop(state);
                self.emit_error(err.to_string());
                return Err(err);
            }
            state.draft = draft.clone();
            if let Err(err) = R::validate(&draft) {
                state.fail(err.to_string());
                drop(state);
                self.emit_error(err.to_string());
                return Err(err.into());
            }
            let body = serde_json::to_value(&draft).map_err(RequestError::from)?;
            (state.issue_keyed(RequestKey::Update(id)), body)
        };
        let collection = R::KIND.collection();

        let result = self.transport.update(collection, id, body).await;

        let mut state = self.inner.lock().await;
        if !state.is_latest(RequestKey::Update(id), seq) {
            debug!("controller: dropping superseded update collection={collection} id={id}");
            return Ok(Outcome::Superseded);
        }
        if let Err(err) = result {
            drop(state);
            return Err(self.request_failed("update", err).await);
        }

        let record = match state.store.get(id) {
            Some(existing) => R::apply(existing, &draft),
            None => R::materialize(id, &draft),
        };
        if !state.store.replace(seq, record.clone()) {
            debug!("controller: updated record left the view collection={collection} id={id}");
        }
        if state.editing == Some(id) {
            state.editing = None;
            state.draft = R::Draft::default();
        }
        let message = format!("{} updated", R::KIND.label());
        state.succeed(message.clone());
        let len = state.store.len();
        drop(state);

        info!("controller: record updated collection={collection} id={id}");
        self.emit(ControllerEvent::Notice {
            kind: R::KIND,
            message,
        });
        self.emit(ControllerEvent::ViewUpdated { kind: R::KIND, len });
        self.after_mutation().await;
        Ok(Outcome::Applied(record))
    }

    /// Deletes `id` on the server, then drops it from the view. Deleting an id
    /// the server no longer knows surfaces the server's error.
    pub async fn remove(&self, id: RecordId) -> Result<()> {
        let seq = self.inner.lock().await.issue();
        let collection = R::KIND.collection();

        if let Err(err) = self.transport.delete(collection, id).await {
            return Err(self.request_failed("delete", err).await);
        }

        let mut state = self.inner.lock().await;
        state.store.remove(seq, id);
        if state.editing == Some(id) {
            state.editing = None;
            state.draft = R::Draft::default();
        }
        let message = format!("{} deleted", R::KIND.label());
        state.succeed(message.clone());
        let len = state.store.len();
        drop(state);

        info!("controller: record deleted collection={collection} id={id}");
        self.emit(ControllerEvent::Notice {
            kind: R::KIND,
            message,
        });
        self.emit(ControllerEvent::ViewUpdated { kind: R::KIND, len });
        self.after_mutation().await;
        Ok(())
    }

    async fn after_mutation(&self) {
        if !self.options.refetch_after_mutation {
            return;
        }
        let window = PageWindow {
            page: 1,
            ..self.window().await
        };
        // Failures are already surfaced through the error message.
        if let Err(err) = self.fetch(window).await {
            warn!(
                "controller: refetch after mutation failed collection={} error={err}",
                R::KIND.collection()
            );
        }
    }

    async fn request_failed(&self, action: &str, err: RequestError) -> ControllerError {
        let message = failure_message(R::KIND, action, &err);
        warn!(
            "controller: {action} failed collection={} error={err}",
            R::KIND.collection()
        );
        self.inner.lock().await.fail(message.clone());
        self.emit_error(message);
        err.into()
    }

    fn emit(&self, event: ControllerEvent) {
        let _ = self.events.send(event);
    }

    fn emit_error(&self, message: String) {
        self.emit(ControllerEvent::Error {
            kind: R::KIND,
            message,
        });
    }
}

/// Server-supplied message verbatim, or a generic one naming the action.
fn failure_message(kind: ResourceKind, action: &str, err: &RequestError) -> String {
    match err.server_message() {
        Some(message) => message.to_string(),
        None => format!(
            "failed to {action} {}: {err}",
            kind.label().to_ascii_lowercase()
        ),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserStats {
    pub total: usize,
    pub male: usize,
    pub female: usize,
}

impl UserStats {
    pub fn from_users<'a>(users: impl IntoIterator<Item = &'a User>) -> Self {
        let mut stats = UserStats::default();
        for user in users {
            stats.total += 1;
            if user.gender.eq_ignore_ascii_case("male") {
                stats.male += 1;
            } else if user.gender.eq_ignore_ascii_case("female") {
                stats.female += 1;
            }
        }
        stats
    }
}

impl ResourceController<Users> {
    /// Gender breakdown over the merged view.
    pub async fn stats(&self) -> UserStats {
        let state = self.inner.lock().await;
        UserStats::from_users(state.store.merged().iter())
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
