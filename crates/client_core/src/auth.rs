use std::sync::Arc;

use shared::{
    error::ValidationError,
    protocol::{LoginRequest, LoginSession},
};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    error::{ControllerError, RequestError, Result},
    transport::ApiTransport,
};

#[derive(Default)]
struct AuthState {
    credentials: LoginRequest,
    error_message: Option<String>,
    success_message: Option<String>,
}

/// Single login call against `/auth/login`. The returned session is handed to
/// the caller and never attached to later requests.
pub struct AuthController {
    transport: Arc<dyn ApiTransport>,
    inner: Mutex<AuthState>,
}

impl AuthController {
    pub fn new(transport: Arc<dyn ApiTransport>) -> Arc<Self> {
        Arc::new(Self {
            transport,
            inner: Mutex::new(AuthState::default()),
        })
    }

    pub async fn credentials(&self) -> LoginRequest {
        self.inner.lock().await.credentials.clone()
    }

    pub async fn error_message(&self) -> Option<String> {
        self.inner.lock().await.error_message.clone()
    }

    pub async fn success_message(&self) -> Option<String> {
        self.inner.lock().await.success_message.clone()
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginSession> {
        let credentials = LoginRequest {
            username: username.trim().to_string(),
            password: password.to_string(),
        };
        {
            let mut state = self.inner.lock().await;
            state.credentials = credentials.clone();
            let missing = if credentials.username.is_empty() {
                Some("username")
            } else if credentials.password.is_empty() {
                Some("password")
            } else {
                None
            };
            if let Some(field) = missing {
                let err = ValidationError::MissingField { field };
                state.success_message = None;
                state.error_message = Some(err.to_string());
                return Err(err.into());
            }
        }

        let result = match self.transport.login(&credentials).await {
            Ok(body) => serde_json::from_value::<LoginSession>(body).map_err(RequestError::from),
            Err(err) => Err(err),
        };

        let mut state = self.inner.lock().await;
        match result {
            Ok(session) => {
                info!(
                    "auth: login succeeded username={} id={}",
                    session.username, session.id
                );
                state.credentials = LoginRequest::default();
                state.error_message = None;
                state.success_message = Some(format!("signed in as {}", session.username));
                Ok(session)
            }
            Err(err) => {
                warn!(
                    "auth: login failed username={} error={err}",
                    credentials.username
                );
                state.success_message = None;
                state.error_message = Some(
                    err.server_message()
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("failed to sign in: {err}")),
                );
                Err(ControllerError::Request(err))
            }
        }
    }
}
