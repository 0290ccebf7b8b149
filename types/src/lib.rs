//! Core domain types for Comfort Kit.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here is shared by the content controller, the background coordinator
//! and the transient UI surfaces.

// Pedantic lint configuration
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod geometry;
mod ids;
pub mod message;

pub use geometry::{Point, Size, Viewport};
pub use ids::{TabId, ToolId, ToolKind};
pub use message::{RuntimeMessage, RuntimeReply, TabMessage};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// NonEmpty String Types
// ============================================================================

/// A string guaranteed to be non-empty (after trimming).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NonEmptyString(String);

#[derive(Debug, Error)]
#[error("text must not be empty")]
pub struct EmptyStringError;

impl NonEmptyString {
    pub fn new(value: impl Into<String>) -> Result<Self, EmptyStringError> {
        let value = value.into();
        if value.trim().is_empty() {
            Err(EmptyStringError)
        } else {
            Ok(Self(value))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<String> for NonEmptyString {
    type Error = EmptyStringError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for NonEmptyString {
    type Error = EmptyStringError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

impl std::ops::Deref for NonEmptyString {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl AsRef<str> for NonEmptyString {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

// ============================================================================
// Credentials & Model
// ============================================================================

/// OpenRouter API key.
///
/// Only constructible from non-blank input, so "key present" is a type-level fact.
/// `Debug` is manually implemented to redact the key value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiKey(<redacted>)")
    }
}

impl ApiKey {
    /// Returns `None` for an empty or whitespace-only key.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    #[must_use]
    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

/// Completion model identifier, e.g. `xiaomi/mimo-v2-flash:free`.
///
/// Never empty: blank input falls back to [`ModelName::DEFAULT`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ModelName(String);

impl ModelName {
    pub const DEFAULT: &'static str = "xiaomi/mimo-v2-flash:free";

    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Self::default()
        } else {
            Self(trimmed.to_string())
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ModelName {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl From<String> for ModelName {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<ModelName> for String {
    fn from(value: ModelName) -> Self {
        value.0
    }
}

impl std::fmt::Display for ModelName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Stored shape of [`Configuration`]. The settings UI writes `openrouterKey: ""`
/// for "no key"; that is normalized to `None` at this boundary.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfiguration {
    #[serde(default)]
    openrouter_key: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    is_dark: bool,
}

/// User configuration snapshot consulted by the router on every request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawConfiguration", into = "RawConfiguration")]
pub struct Configuration {
    pub api_key: Option<ApiKey>,
    pub model: ModelName,
    pub is_dark: bool,
}

impl From<RawConfiguration> for Configuration {
    fn from(raw: RawConfiguration) -> Self {
        Self {
            api_key: raw.openrouter_key.as_deref().and_then(ApiKey::parse),
            model: raw.model.as_deref().map(ModelName::parse).unwrap_or_default(),
            is_dark: raw.is_dark,
        }
    }
}

impl From<Configuration> for RawConfiguration {
    fn from(config: Configuration) -> Self {
        Self {
            openrouter_key: Some(config.api_key.map(|key| key.0).unwrap_or_default()),
            model: Some(config.model.0),
            is_dark: config.is_dark,
        }
    }
}

/// Everything the settings UI persists under the configuration blob key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionState {
    #[serde(default)]
    pub config: Configuration,
    #[serde(default = "default_tools")]
    pub tools: Vec<ToolDescriptor>,
}

impl Default for ExtensionState {
    fn default() -> Self {
        Self {
            config: Configuration::default(),
            tools: default_tools(),
        }
    }
}

// ============================================================================
// Tools
// ============================================================================

/// Visual grouping for toolbar dividers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolGroup {
    Ai,
    Search,
    Util,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub id: ToolId,
    pub label: String,
    pub icon: String,
    pub active: bool,
    pub group: ToolGroup,
    pub color: String,
}

impl ToolDescriptor {
    fn seeded(id: &str, label: &str, icon: &str, group: ToolGroup, color: &str) -> Self {
        Self {
            id: ToolId::new(id),
            label: label.to_string(),
            icon: icon.to_string(),
            active: true,
            group,
            color: color.to_string(),
        }
    }
}

/// Tool list written on first install.
#[must_use]
pub fn default_tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::seeded(
            ToolId::SUMMARIZE,
            "Summarize",
            "auto_awesome",
            ToolGroup::Ai,
            "text-amber-400",
        ),
        ToolDescriptor::seeded(
            ToolId::EXPLAIN,
            "Deep Explain",
            "psychology",
            ToolGroup::Ai,
            "text-indigo-400",
        ),
        ToolDescriptor::seeded(
            ToolId::WIKI,
            "Wikipedia",
            "menu_book",
            ToolGroup::Search,
            "text-sky-400",
        ),
        ToolDescriptor::seeded(
            ToolId::COPY,
            "Smart Copy",
            "content_copy",
            ToolGroup::Util,
            "text-emerald-400",
        ),
    ]
}

// ============================================================================
// Selection & Requests
// ============================================================================

/// Immutable capture of the page selection at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSnapshot {
    text: NonEmptyString,
    origin_tab: TabId,
    captured_at: DateTime<Utc>,
}

impl SelectionSnapshot {
    /// Trims `raw`; fails when nothing is left.
    pub fn capture(raw: &str, origin_tab: TabId) -> Result<Self, EmptyStringError> {
        Ok(Self {
            text: NonEmptyString::new(raw.trim())?,
            origin_tab,
            captured_at: Utc::now(),
        })
    }

    #[must_use]
    pub fn text(&self) -> &str {
        self.text.as_str()
    }

    #[must_use]
    pub fn origin_tab(&self) -> TabId {
        self.origin_tab
    }

    #[must_use]
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Consumes the snapshot; the request carries its text verbatim.
    #[must_use]
    pub fn into_request(self, tool_id: ToolId) -> ToolInvocationRequest {
        ToolInvocationRequest {
            tool_id,
            text: self.text.into_inner(),
            origin_tab: Some(self.origin_tab),
        }
    }
}

/// A single tool invocation as seen by the router.
///
/// `origin_tab` is `None` only for menu triggers fired outside any tab; such
/// requests are still executed but their result has nowhere to go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocationRequest {
    pub tool_id: ToolId,
    pub text: String,
    pub origin_tab: Option<TabId>,
}

// ============================================================================
// Results
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikiItem {
    pub title: String,
    pub snippet: String,
    #[serde(rename = "image", default)]
    pub image_url: Option<String>,
}

/// What the router sends back to the originating tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolResult {
    Notification { message: String },
    WikiResults { items: Vec<WikiItem> },
    AiAnswer { tool_id: ToolId, text: String },
}

impl ToolResult {
    pub fn notification(message: impl Into<String>) -> Self {
        Self::Notification {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn into_message(self) -> TabMessage {
        match self {
            Self::Notification { message } => TabMessage::ShowNotification { message },
            Self::WikiResults { items } => TabMessage::ShowWikiResults { results: items },
            Self::AiAnswer { tool_id, text } => TabMessage::ShowAiResult {
                mode: tool_id,
                text,
            },
        }
    }
}

// ============================================================================
// Session Stats
// ============================================================================

/// Popup quick-stats counters. Only ever incremented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    #[serde(default)]
    pub pages_visited: u64,
    #[serde(default)]
    pub links_found: u64,
    #[serde(default)]
    pub actions_run: u64,
}
