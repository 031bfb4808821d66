//! Transport for the backend's tool-calling chat endpoint.

use async_trait::async_trait;
use lifeos_core::error::ApiResult;
use lifeos_core::http::http_client;
use lifeos_core::AppConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::conversation::HistoryEntry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub conversation_history: Vec<HistoryEntry>,
    pub provider: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatReply {
    /// The model answered; `tools_used` lists backend tools that ran, in order.
    Answer {
        response: String,
        tools_used: Vec<String>,
    },
    /// The backend reported a logical failure (bad tool arguments, provider rejection).
    Failure(String),
}

#[derive(Debug, Deserialize)]
struct RawReply {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    tools_used: Option<Vec<String>>,
    #[serde(default)]
    error: Option<Value>,
}

impl ChatReply {
    /// Interpret a response body. An `error` member wins regardless of anything else.
    pub fn from_value(body: Value) -> Result<Self, ChatError> {
        let raw: RawReply =
            serde_json::from_value(body).map_err(|err| ChatError::Decode(err.to_string()))?;
        match raw.error {
            Some(Value::Null) | None => Ok(ChatReply::Answer {
                response: raw.response.unwrap_or_default(),
                tools_used: raw.tools_used.unwrap_or_default(),
            }),
            Some(Value::String(message)) => Ok(ChatReply::Failure(message)),
            Some(other) => Ok(ChatReply::Failure(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("Server unreachable: {0}")]
    Unreachable(String),
    #[error("Unreadable chat response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, ChatError>;
}

#[derive(Debug, Clone)]
pub struct HttpChatClient {
    client: reqwest::Client,
    url: String,
}

impl HttpChatClient {
    pub fn new(config: &AppConfig) -> ApiResult<Self> {
        Ok(Self {
            client: http_client(config)?,
            url: config.chat_url(),
        })
    }
}

#[async_trait]
impl ChatApi for HttpChatClient {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, ChatError> {
        tracing::debug!(
            url = self.url.as_str(),
            provider = request.provider.as_str(),
            model = request.model.as_str(),
            turns = request.conversation_history.len(),
            "chat request"
        );
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|err| ChatError::Unreachable(err.to_string()))?;
        let status = response.status();
        let body = response
            .json::<Value>()
            .await
            .map_err(|err| ChatError::Decode(format!("{} ({})", err, status)))?;
        ChatReply::from_value(body)
    }
}
