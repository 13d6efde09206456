use std::sync::Arc;

use shared::{
    domain::ResourceKind,
    resource::{Carts, Comments, Posts, Products, Todos, Users},
};
use tracing::info;

pub mod auth;
pub mod config;
pub mod controller;
pub mod error;
pub mod store;
pub mod transport;

pub use auth::AuthController;
pub use config::{load_settings, ClientSettings};
pub use controller::{
    ControllerEvent, ControllerOptions, ControllerSnapshot, Outcome, PageWindow,
    ResourceController, UserStats,
};
pub use error::{ControllerError, RequestError};
pub use store::{EntryStatus, RecordStore, ViewEntry};
pub use transport::{ApiTransport, HttpTransport};

/// One controller per collection plus the login form, all over one transport.
pub struct Dashboard {
    pub users: Arc<ResourceController<Users>>,
    pub products: Arc<ResourceController<Products>>,
    pub carts: Arc<ResourceController<Carts>>,
    pub posts: Arc<ResourceController<Posts>>,
    pub comments: Arc<ResourceController<Comments>>,
    pub todos: Arc<ResourceController<Todos>>,
    pub auth: Arc<AuthController>,
}

impl Dashboard {
    pub fn new(transport: Arc<dyn ApiTransport>, options: ControllerOptions) -> Self {
        Self {
            users: ResourceController::new(Arc::clone(&transport), options),
            products: ResourceController::new(Arc::clone(&transport), options),
            carts: ResourceController::new(Arc::clone(&transport), options),
            posts: ResourceController::new(Arc::clone(&transport), options),
            comments: ResourceController::new(Arc::clone(&transport), options),
            todos: ResourceController::new(Arc::clone(&transport), options),
            auth: AuthController::new(transport),
        }
    }

    pub fn connect(settings: &ClientSettings) -> Result<Self, RequestError> {
        let transport = HttpTransport::new(&settings.api_base_url)?;
        info!(
            "dashboard: using api base_url={} page_size={}",
            transport.base_url(),
            settings.page_size
        );
        Ok(Self::new(
            Arc::new(transport),
            settings.controller_options(),
        ))
    }

    /// Loads the current page of every collection concurrently and returns the
    /// collections that failed.
    pub async fn refresh_all(&self) -> Vec<(ResourceKind, ControllerError)> {
        let (users, products, carts, posts, comments, todos) = tokio::join!(
            self.users.refresh(),
            self.products.refresh(),
            self.carts.refresh(),
            self.posts.refresh(),
            self.comments.refresh(),
            self.todos.refresh(),
        );
        let results = [
            (ResourceKind::Users, users.map(|_| ())),
            (ResourceKind::Products, products.map(|_| ())),
            (ResourceKind::Carts, carts.map(|_| ())),
            (ResourceKind::Posts, posts.map(|_| ())),
            (ResourceKind::Comments, comments.map(|_| ())),
            (ResourceKind::Todos, todos.map(|_| ())),
        ];
        results
            .into_iter()
            .filter_map(|(kind, result)| result.err().map(|err| (kind, err)))
            .collect()
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
