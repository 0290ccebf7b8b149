//! Configuration loading and durable storage for Comfort Kit.
//!
//! Two unrelated kinds of state live here:
//!
//! - [`AppConfig`]: operator-level settings read once at startup from
//!   `~/.comfort/config.toml` (endpoints, timeouts, where the store lives).
//! - [`ConfigStore`]: the durable key/value store shared by every context. It
//!   holds the user configuration blob written by the settings UI (API key,
//!   model, tool list) and ephemeral session data (last selection, counters).
//!   The router re-reads it on every request; nothing caches it.

mod state;
mod store;

pub use state::{ConfigStore, SELECTED_TEXT_KEY, SELECTION_COUNT_KEY, SESSION_STATS_KEY, STATE_KEY};
pub use store::{FileStorage, MemoryStorage, StorageBackend, StorageScope, StoreError};

use serde::Deserialize;
use std::{env, fs, path::PathBuf, time::Duration};
use url::Url;

/// Env var that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "COMFORT_CONFIG";

const DEFAULT_NOTIFICATION_MS: u64 = 2000;
const DEFAULT_MAX_RESULTS: u32 = 10;
const DEFAULT_THUMBNAIL_SIZE: u32 = 400;
const DEFAULT_COMPLETION_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    pub search: Option<SearchConfig>,
    pub completion: Option<CompletionConfig>,
    pub ui: Option<UiConfig>,
    pub storage: Option<StorageConfig>,
}

/// Wikipedia search endpoint settings.
///
/// ```toml
/// [search]
/// endpoint = "https://de.wikipedia.org/w/api.php"
/// max_results = 10
/// thumbnail_size = 400
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct SearchConfig {
    pub endpoint: Option<String>,
    pub max_results: Option<u32>,
    pub thumbnail_size: Option<u32>,
}

/// Completion API settings. `referer` and `title` identify the caller to
/// OpenRouter.
///
/// ```toml
/// [completion]
/// endpoint = "https://openrouter.ai/api/v1/chat/completions"
/// referer = "https://example.com/comfort-kit"
/// title = "Comfort Kit"
/// timeout_secs = 120
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct CompletionConfig {
    pub endpoint: Option<String>,
    pub referer: Option<String>,
    pub title: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UiConfig {
    /// How long a notification toast stays up.
    pub notification_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StorageConfig {
    /// Directory holding `local.json` and `sync.json`. Supports `${ENV_VAR}`.
    pub dir: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid URL for {field}: {value}: {source}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        source: url::ParseError,
    },
}

/// Fully-resolved settings. Existence of a value is the proof of its validity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// `None` keeps the adapter's built-in endpoint.
    pub search_endpoint: Option<Url>,
    pub search_max_results: u32,
    pub search_thumbnail_size: u32,
    pub completion_endpoint: Option<Url>,
    pub completion_referer: Option<String>,
    pub completion_title: Option<String>,
    pub completion_timeout: Duration,
    pub notification_duration: Duration,
    pub storage_dir: PathBuf,
}

pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let var = &after[..end];
                if !var.is_empty() {
                    out.push_str(&env::var(var).unwrap_or_default());
                }
                rest = &after[end + 1..];
            }
            None => {
                // Unclosed brace: keep the remainder literally.
                out.push_str(&rest[start..]);
                return out;
            }
        }
    }

    out.push_str(rest);
    out
}

fn parse_url(field: &'static str, raw: Option<&String>) -> Result<Option<Url>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let value = expand_env_vars(raw.trim());
    Url::parse(&value)
        .map(Some)
        .map_err(|source| ConfigError::InvalidUrl {
            field,
            value,
            source,
        })
}

fn non_blank(raw: Option<&String>) -> Option<String> {
    raw.map(|value| expand_env_vars(value.trim()))
        .filter(|value| !value.is_empty())
}

impl AppConfig {
    /// Load the config file. A missing file is not an error.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = config_path() else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read { path, source: err });
            }
        };

        Self::parse(&content).map(Some).map_err(|err| {
            tracing::warn!("Failed to parse config at {:?}: {}", path, err);
            ConfigError::Parse { path, source: err }
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    pub fn resolve(&self) -> Result<ResolvedConfig, ConfigError> {
        let search = self.search.as_ref();
        let completion = self.completion.as_ref();

        let storage_dir = self
            .storage
            .as_ref()
            .and_then(|storage| non_blank(storage.dir.as_ref()))
            .map(PathBuf::from)
            .unwrap_or_else(default_storage_dir);

        Ok(ResolvedConfig {
            search_endpoint: parse_url(
                "search.endpoint",
                search.and_then(|s| s.endpoint.as_ref()),
            )?,
            search_max_results: search
                .and_then(|s| s.max_results)
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_MAX_RESULTS),
            search_thumbnail_size: search
                .and_then(|s| s.thumbnail_size)
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_THUMBNAIL_SIZE),
            completion_endpoint: parse_url(
                "completion.endpoint",
                completion.and_then(|c| c.endpoint.as_ref()),
            )?,
            completion_referer: completion.and_then(|c| non_blank(c.referer.as_ref())),
            completion_title: completion.and_then(|c| non_blank(c.title.as_ref())),
            completion_timeout: Duration::from_secs(
                completion
                    .and_then(|c| c.timeout_secs)
                    .filter(|secs| *secs > 0)
                    .unwrap_or(DEFAULT_COMPLETION_TIMEOUT_SECS),
            ),
            notification_duration: Duration::from_millis(
                self.ui
                    .as_ref()
                    .and_then(|ui| ui.notification_ms)
                    .unwrap_or(DEFAULT_NOTIFICATION_MS),
            ),
            storage_dir,
        })
    }
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            search_endpoint: None,
            search_max_results: DEFAULT_MAX_RESULTS,
            search_thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
            completion_endpoint: None,
            completion_referer: None,
            completion_title: None,
            completion_timeout: Duration::from_secs(DEFAULT_COMPLETION_TIMEOUT_SECS),
            notification_duration: Duration::from_millis(DEFAULT_NOTIFICATION_MS),
            storage_dir: default_storage_dir(),
        }
    }
}

/// `$COMFORT_CONFIG`, else `~/.comfort/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    if let Ok(path) = env::var(CONFIG_PATH_ENV)
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".comfort").join("config.toml"))
}

fn default_storage_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".comfort").join("storage"))
        .unwrap_or_else(|| PathBuf::from(".comfort").join("storage"))
}
