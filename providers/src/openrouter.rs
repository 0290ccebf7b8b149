//! OpenRouter chat completions adapter.
//!
//! One non-streaming POST per AI tool click. The tool id is folded into the
//! prompt (`"summarize: <text>"`); there is no system message.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderValue};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    CompletionBackend, CompletionFut, CompletionRequest, OPENROUTER_CHAT_URL, http_client,
    read_capped_error_body,
};

pub const DEFAULT_REFERER: &str = "comfort-kit://headless";
pub const DEFAULT_TITLE: &str = "Comfort Kit";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("API error: {status}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("invalid header value for {name}")]
    InvalidHeader { name: &'static str },
}

#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    client: reqwest::Client,
    endpoint: Url,
    referer: String,
    title: String,
    timeout: Duration,
}

impl Default for OpenRouterClient {
    fn default() -> Self {
        Self::new(http_client().clone())
    }
}

impl OpenRouterClient {
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            endpoint: Url::parse(OPENROUTER_CHAT_URL)
                .unwrap_or_else(|_| unreachable!("OPENROUTER_CHAT_URL is valid")),
            referer: DEFAULT_REFERER.to_string(),
            title: DEFAULT_TITLE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Caller identity sent as `HTTP-Referer` and `X-Title`.
    #[must_use]
    pub fn with_identity(mut self, referer: impl Into<String>, title: impl Into<String>) -> Self {
        self.referer = referer.into();
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub async fn chat(&self, request: CompletionRequest<'_>) -> Result<String, CompletionError> {
        let prompt = request.prompt();
        let body = ChatRequest {
            model: request.model.as_str(),
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
        };

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", request.api_key.expose_secret()))
            .map_err(|_| CompletionError::InvalidHeader {
                name: "Authorization",
            })?;
        auth.set_sensitive(true);
        let referer = HeaderValue::from_str(&self.referer)
            .map_err(|_| CompletionError::InvalidHeader { name: "HTTP-Referer" })?;
        let title = HeaderValue::from_str(&self.title)
            .map_err(|_| CompletionError::InvalidHeader { name: "X-Title" })?;

        tracing::debug!(
            tool = %request.tool_id,
            model = %request.model,
            endpoint = %self.endpoint,
            "Sending completion request"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .timeout(self.timeout)
            .header(AUTHORIZATION, auth)
            .header("HTTP-Referer", referer)
            .header("X-Title", title)
            .json(&body)
            .send()
            .await
            .map_err(CompletionError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = read_capped_error_body(response).await;
            tracing::warn!(status = status.as_u16(), %body, "Completion request rejected");
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await.map_err(CompletionError::Transport)?;
        let parsed: ChatResponse =
            serde_json::from_str(&text).map_err(|e| CompletionError::Malformed(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or_else(|| CompletionError::Malformed("missing choices[0].message.content".into()))
    }
}

impl CompletionBackend for OpenRouterClient {
    fn complete<'a>(&'a self, request: CompletionRequest<'a>) -> CompletionFut<'a> {
        Box::pin(self.chat(request))
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}
