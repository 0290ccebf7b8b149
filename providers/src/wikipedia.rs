//! MediaWiki search adapter.
//!
//! A lookup is two GETs against the action API: `list=search` for the hits, then
//! `prop=pageimages` for thumbnails of those hits. Thumbnails are matched back to
//! hits by exact title; a hit without one keeps `image_url: None`.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use comfort_types::WikiItem;

use crate::{SearchBackend, SearchFut, WIKIPEDIA_API_URL, http_client, read_capped_error_body};

pub const DEFAULT_MAX_RESULTS: u32 = 10;
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 400;
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("search API error: {status}")]
    Status { status: u16 },
    #[error("malformed search response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone)]
pub struct WikipediaSearch {
    client: reqwest::Client,
    endpoint: Url,
    max_results: u32,
    thumbnail_size: u32,
    timeout: Duration,
}

impl Default for WikipediaSearch {
    fn default() -> Self {
        Self::new(http_client().clone())
    }
}

impl WikipediaSearch {
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            endpoint: default_endpoint(),
            max_results: DEFAULT_MAX_RESULTS,
            thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    #[must_use]
    pub fn with_limits(mut self, max_results: u32, thumbnail_size: u32) -> Self {
        self.max_results = max_results;
        self.thumbnail_size = thumbnail_size;
        self
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn search_url(&self, query: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("action", "query")
            .append_pair("list", "search")
            .append_pair("srsearch", query)
            .append_pair("srlimit", &self.max_results.to_string())
            .append_pair("format", "json")
            .append_pair("origin", "*");
        url
    }

    fn thumbnails_url(&self, titles: &[&str]) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("action", "query")
            .append_pair("titles", &titles.join("|"))
            .append_pair("prop", "pageimages")
            .append_pair("pithumbsize", &self.thumbnail_size.to_string())
            .append_pair("format", "json")
            .append_pair("origin", "*");
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, SearchError> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(SearchError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = read_capped_error_body(response).await;
            tracing::warn!(status = status.as_u16(), %body, "Wikipedia request failed");
            return Err(SearchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(SearchError::Transport)?;
        serde_json::from_str(&body).map_err(|e| SearchError::Malformed(e.to_string()))
    }

    pub async fn lookup(&self, query: &str) -> Result<Vec<WikiItem>, SearchError> {
        let hits: SearchResponse = self.get_json(self.search_url(query)).await?;
        let hits = hits.query.map(|q| q.search).unwrap_or_default();
        if hits.is_empty() {
            tracing::debug!(query, "No Wikipedia hits");
            return Ok(Vec::new());
        }

        let thumbnails_url = {
            let titles: Vec<&str> = hits.iter().map(|hit| hit.title.as_str()).collect();
            self.thumbnails_url(&titles)
        };
        let pages: PagesResponse = self.get_json(thumbnails_url).await?;
        let thumbnails: HashMap<String, String> = pages
            .query
            .map(|q| q.pages)
            .unwrap_or_default()
            .into_values()
            .filter_map(|page| Some((page.title?, page.thumbnail?.source)))
            .collect();

        Ok(hits
            .into_iter()
            .map(|hit| WikiItem {
                image_url: thumbnails.get(&hit.title).cloned(),
                title: hit.title,
                snippet: hit.snippet,
            })
            .collect())
    }
}

impl SearchBackend for WikipediaSearch {
    fn search<'a>(&'a self, query: &'a str) -> SearchFut<'a> {
        Box::pin(self.lookup(query))
    }
}

fn default_endpoint() -> Url {
    Url::parse(WIKIPEDIA_API_URL).unwrap_or_else(|_| unreachable!("WIKIPEDIA_API_URL is valid"))
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
    #[serde(default)]
    snippet: String,
}

#[derive(Debug, Deserialize)]
struct PagesResponse {
    query: Option<PagesQuery>,
}

#[derive(Debug, Deserialize)]
struct PagesQuery {
    #[serde(default)]
    pages: HashMap<String, Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    title: Option<String>,
    thumbnail: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    source: String,
}
