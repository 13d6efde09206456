use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;
use shared::{
    domain::RecordId,
    error::ApiError,
    protocol::{LoginRequest, PageQuery},
};
use tracing::debug;
use url::Url;

use crate::error::RequestError;

pub const DEFAULT_API_BASE_URL: &str = "https://dummyjson.com/";

/// Request/response seam to the remote collections API.
///
/// Bodies stay as JSON values here; typed decoding belongs to the controllers
/// so one transport can serve every collection.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn list(&self, collection: &str, query: PageQuery) -> Result<Value, RequestError>;
    async fn create(&self, collection: &str, body: Value) -> Result<Value, RequestError>;
    async fn update(
        &self,
        collection: &str,
        id: RecordId,
        body: Value,
    ) -> Result<Value, RequestError>;
    async fn delete(&self, collection: &str, id: RecordId) -> Result<Value, RequestError>;
    async fn login(&self, credentials: &LoginRequest) -> Result<Value, RequestError>;
}

pub struct HttpTransport {
    http: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self, RequestError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Result<Self, RequestError> {
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base_url = Url::parse(&normalized).map_err(|err| {
            RequestError::Transport(format!("invalid api base url '{base_url}': {err}"))
        })?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, RequestError> {
        self.base_url
            .join(path)
            .map_err(|err| RequestError::Transport(format!("invalid endpoint '{path}': {err}")))
    }
}

async fn read_json(response: Response) -> Result<Value, RequestError> {
    let status = response.status();
    let bytes = response.bytes().await?;
    if !status.is_success() {
        let message = serde_json::from_slice::<ApiError>(&bytes)
            .ok()
            .map(|body| body.message);
        return Err(RequestError::Status {
            status: status.as_u16(),
            message,
        });
    }
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn list(&self, collection: &str, query: PageQuery) -> Result<Value, RequestError> {
        let url = self.endpoint(collection)?;
        debug!(
            "transport: GET {url} limit={} skip={}",
            query.limit, query.skip
        );
        let response = self.http.get(url).query(&query).send().await?;
        read_json(response).await
    }

    async fn create(&self, collection: &str, body: Value) -> Result<Value, RequestError> {
        let url = self.endpoint(&format!("{collection}/add"))?;
        debug!("transport: POST {url}");
        let response = self.http.post(url).json(&body).send().await?;
        read_json(response).await
    }

    async fn update(
        &self,
        collection: &str,
        id: RecordId,
        body: Value,
    ) -> Result<Value, RequestError> {
        let url = self.endpoint(&format!("{collection}/{id}"))?;
        debug!("transport: PUT {url}");
        let response = self.http.put(url).json(&body).send().await?;
        read_json(response).await
    }

    async fn delete(&self, collection: &str, id: RecordId) -> Result<Value, RequestError> {
        let url = self.endpoint(&format!("{collection}/{id}"))?;
        debug!("transport: DELETE {url}");
        let response = self.http.delete(url).send().await?;
        read_json(response).await
    }

    async fn login(&self, credentials: &LoginRequest) -> Result<Value, RequestError> {
        let url = self.endpoint("auth/login")?;
        debug!("transport: POST {url} username={}", credentials.username);
        let response = self.http.post(url).json(credentials).send().await?;
        read_json(response).await
    }
}
