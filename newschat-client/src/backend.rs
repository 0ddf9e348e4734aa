//! HTTP client for the chat backend session API

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use newschat_core::ContextItem;

use crate::error::{BackendError, BackendResult};

/// Reply text substituted when the backend answers without one
pub const FALLBACK_ANSWER: &str = "Oops! No response available.";

/// One persisted turn of backend history
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryTurn {
    pub role: String,
    pub content: String,
}

/// A generated reply plus its citations
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub answer: String,
    pub context: Vec<ContextItem>,
}

#[derive(Debug, Deserialize)]
struct NewSessionResponse {
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct ChatHistoryResponse {
    #[serde(default)]
    messages: Vec<HistoryTurn>,
}

#[derive(Debug, Serialize)]
struct TurnRequest<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    session_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    news_context: Option<Vec<ContextItemWire>>,
}

#[derive(Debug, Deserialize)]
struct ContextItemWire {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    description: String,
}

/// Client for the chat backend HTTP API
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    /// Create a client for the given base URL
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self { client, base_url }
    }

    /// The configured base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Health check: the backend is ready when /ping returns 2xx with JSON
    pub async fn ping(&self) -> BackendResult<()> {
        let url = format!("{}/ping", self.base_url);
        let body = self.get_body(&url).await?;
        serde_json::from_str::<serde_json::Value>(&body)?;
        Ok(())
    }

    /// Request a fresh session id
    pub async fn create_session(&self) -> BackendResult<String> {
        let url = format!("{}/api/session/new_session/", self.base_url);
        let body = self.get_body(&url).await?;
        let parsed: NewSessionResponse = serde_json::from_str(&body)?;
        Ok(parsed.session_id)
    }

    /// Fetch the persisted turns for a session; empty when none
    pub async fn chat_history(&self, session_id: &str) -> BackendResult<Vec<HistoryTurn>> {
        let url = format!("{}/api/session/chat_history/{}", self.base_url, session_id);
        let body = self.get_body(&url).await?;
        let parsed: ChatHistoryResponse = serde_json::from_str(&body)?;
        Ok(parsed.messages)
    }

    /// Persist one turn; the response body is not consumed
    pub async fn post_turn(&self, session_id: &str, role: &str, content: &str) -> BackendResult<()> {
        let url = format!("{}/api/session/chat_message/{}", self.base_url, session_id);
        debug!("Persisting {} turn for session {}", role, session_id);

        let response = self
            .client
            .post(&url)
            .json(&TurnRequest { role, content })
            .send()
            .await?;
        Self::read_success_body(response).await?;
        Ok(())
    }

    /// Drop the backend-side history for a session
    pub async fn reset_session(&self, session_id: &str) -> BackendResult<()> {
        let url = format!("{}/api/session/reset/{}", self.base_url, session_id);
        debug!("Resetting backend session {}", session_id);

        let response = self.client.post(&url).send().await?;
        Self::read_success_body(response).await?;
        Ok(())
    }

    /// Send a user utterance and return the generated reply with citations
    pub async fn send_chat(&self, session_id: &str, text: &str) -> BackendResult<ChatReply> {
        let url = format!("{}/api/chat", self.base_url);
        debug!("Sending chat request for session {}", session_id);

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest {
                message: text,
                session_id,
            })
            .send()
            .await?;
        let body = Self::read_success_body(response).await?;
        let parsed: ChatResponse = serde_json::from_str(&body)?;

        let answer = parsed
            .answer
            .filter(|answer| !answer.is_empty())
            .unwrap_or_else(|| FALLBACK_ANSWER.to_string());
        let context = parsed
            .news_context
            .unwrap_or_default()
            .into_iter()
            .map(|item| ContextItem {
                title: item.title,
                url: item.url,
                description: item.description,
            })
            .collect();

        Ok(ChatReply { answer, context })
    }

    async fn get_body(&self, url: &str) -> BackendResult<String> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        Self::read_success_body(response).await
    }

    /// Read the body as text, mapping non-2xx statuses to `Api` errors.
    ///
    /// Bodies are parsed with serde_json afterwards so transport failures
    /// and malformed payloads stay distinguishable.
    async fn read_success_body(response: reqwest::Response) -> BackendResult<String> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(BackendError::Api(format!("HTTP {}: {}", status, body)));
        }
        Ok(body)
    }
}
