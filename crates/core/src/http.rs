//! `reqwest`-backed [`ResourceApi`] talking to the REST backend.

use async_trait::async_trait;
use reqwest::{Method, Response, StatusCode};
use serde_json::Value;

use crate::api::{Endpoint, ListSource, ResourceApi};
use crate::config::AppConfig;
use crate::error::{ApiError, ApiResult};
use crate::model::ResourceId;

const UA: &str = concat!("lifeos/", env!("CARGO_PKG_VERSION"));

/// Build the shared HTTP client; no timeout unless the configuration asks for one.
pub fn http_client(config: &AppConfig) -> ApiResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(UA);
    if let Some(timeout) = config.request_timeout() {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|err| ApiError::Transport(err.to_string()))
}

#[derive(Debug, Clone)]
pub struct HttpResourceApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpResourceApi {
    pub fn new(config: &AppConfig) -> ApiResult<Self> {
        Ok(Self {
            client: http_client(config)?,
            base_url: config.api_url().trim_end_matches('/').to_string(),
        })
    }

    fn collection_url(&self, endpoint: Endpoint) -> String {
        format!("{}/{}/", self.base_url, endpoint.path())
    }

    fn member_url(&self, endpoint: Endpoint, id: ResourceId) -> String {
        format!("{}/{}/{}/", self.base_url, endpoint.path(), id)
    }

    async fn send(
        &self,
        method: Method,
        url: String,
        body: Option<Value>,
    ) -> ApiResult<Option<Value>> {
        tracing::debug!(method = %method, url = url.as_str(), "resource request");
        let is_delete = method == Method::DELETE;
        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request
            .send()
            .await
            .map_err(|err| ApiError::Transport(err.to_string()))?;
        read_body(response, is_delete).await
    }
}

async fn read_body(response: Response, is_delete: bool) -> ApiResult<Option<Value>> {
    let status = response.status();
    if !status.is_success() {
        let body: Value = response.json().await.unwrap_or(Value::Null);
        return Err(ApiError::status(status.as_u16(), failure_message(status, &body)));
    }
    if status == StatusCode::NO_CONTENT || is_delete {
        return Ok(None);
    }
    let value = response
        .json::<Value>()
        .await
        .map_err(|err| ApiError::Decode(err.to_string()))?;
    Ok(Some(value))
}

/// Prefer the backend's own `error` text over the generic status phrase.
fn failure_message(status: StatusCode, body: &Value) -> String {
    match body.get("error").and_then(Value::as_str) {
        Some(message) => message.to_string(),
        None => format!(
            "Request failed: {}",
            status.canonical_reason().unwrap_or("Unknown status")
        ),
    }
}

fn require_body(value: Option<Value>) -> ApiResult<Value> {
    value.ok_or_else(|| ApiError::Decode("empty response body".into()))
}

#[async_trait]
impl ResourceApi for HttpResourceApi {
    async fn list(&self, endpoint: Endpoint, source: &ListSource) -> ApiResult<Vec<Value>> {
        let url = match source {
            ListSource::All => self.collection_url(endpoint),
            ListSource::Filter { key, value } => {
                format!("{}?{}={}", self.collection_url(endpoint), key, value)
            }
            ListSource::Action(action) => format!("{}{}/", self.collection_url(endpoint), action),
        };
        let body = require_body(self.send(Method::GET, url, None).await?)?;
        match body {
            Value::Array(items) => Ok(items),
            other => Err(ApiError::Decode(format!(
                "expected a list from {}, got {}",
                endpoint, other
            ))),
        }
    }

    async fn create(&self, endpoint: Endpoint, fields: Value) -> ApiResult<Value> {
        let url = self.collection_url(endpoint);
        require_body(self.send(Method::POST, url, Some(fields)).await?)
    }

    async fn patch(&self, endpoint: Endpoint, id: ResourceId, fields: Value) -> ApiResult<Value> {
        let url = self.member_url(endpoint, id);
        require_body(self.send(Method::PATCH, url, Some(fields)).await?)
    }

    async fn remove(&self, endpoint: Endpoint, id: ResourceId) -> ApiResult<()> {
        let url = self.member_url(endpoint, id);
        self.send(Method::DELETE, url, None).await.map(|_| ())
    }

    async fn member_action(
        &self,
        endpoint: Endpoint,
        id: ResourceId,
        action: &str,
        body: Value,
    ) -> ApiResult<Value> {
        let url = format!("{}{}/", self.member_url(endpoint, id), action);
        require_body(self.send(Method::POST, url, Some(body)).await?)
    }
}
