//! Adapters for the two external services the router calls.
//!
//! - [`wikipedia`] - MediaWiki search plus a thumbnail lookup for the hits
//! - [`openrouter`] - OpenRouter chat completions for every AI-style tool
//!
//! Both adapters sit behind object-safe traits ([`SearchBackend`],
//! [`CompletionBackend`]) so the router can be driven by mocks in tests. Neither
//! retries: one request in, one typed result out.

pub mod openrouter;
pub mod wikipedia;

use std::future::Future;
use std::pin::Pin;
use std::sync::OnceLock;
use std::time::Duration;

use comfort_types::{ApiKey, ModelName, ToolId, WikiItem};

pub use openrouter::{CompletionError, OpenRouterClient};
pub use wikipedia::{SearchError, WikipediaSearch};

/// Canonical MediaWiki action API endpoint.
pub const WIKIPEDIA_API_URL: &str = "https://en.wikipedia.org/w/api.php";
/// Canonical OpenRouter chat completions endpoint.
pub const OPENROUTER_CHAT_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

const CONNECT_TIMEOUT_SECS: u64 = 30;
const TCP_KEEPALIVE_SECS: u64 = 60;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

const USER_AGENT: &str = concat!("comfort-kit/", env!("CARGO_PKG_VERSION"));

pub fn http_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        base_client_builder().build().unwrap_or_else(|e| {
            tracing::error!("Failed to build HTTP client: {e}. Falling back to defaults.");
            reqwest::Client::new()
        })
    })
}

fn base_client_builder() -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::none())
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
}

/// Read at most 32 KiB of an error response for logging.
pub async fn read_capped_error_body(response: reqwest::Response) -> String {
    use futures_util::StreamExt;
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}

// ============================================================================
// Backend seams
// ============================================================================

pub type SearchFut<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<WikiItem>, SearchError>> + Send + 'a>>;

pub type CompletionFut<'a> =
    Pin<Box<dyn Future<Output = Result<String, CompletionError>> + Send + 'a>>;

pub trait SearchBackend: Send + Sync {
    /// Hits for `query`, in the order the service ranked them. No hits is `Ok(vec![])`.
    fn search<'a>(&'a self, query: &'a str) -> SearchFut<'a>;
}

/// Everything one completion call needs.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub tool_id: &'a ToolId,
    pub text: &'a str,
    pub model: &'a ModelName,
    pub api_key: &'a ApiKey,
}

impl CompletionRequest<'_> {
    /// The single user turn sent to the model: `"<tool>: <text>"`.
    #[must_use]
    pub fn prompt(&self) -> String {
        format!("{}: {}", self.tool_id, self.text)
    }
}

pub trait CompletionBackend: Send + Sync {
    fn complete<'a>(&'a self, request: CompletionRequest<'a>) -> CompletionFut<'a>;
}
