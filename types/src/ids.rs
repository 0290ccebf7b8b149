use std::fmt;

use serde::{Deserialize, Serialize};

/// Host-assigned identifier of a browser tab (the address of a content context).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(i64);

impl TabId {
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the router treats a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    /// Clipboard write, handled without any network call.
    Copy,
    /// Wikipedia lookup through the search adapter.
    Wiki,
    /// Anything else is sent to the completion API as `"<tool>: <text>"`.
    Ai,
}

/// Identifier of a user-selectable tool (`summarize`, `wiki`, ...).
///
/// Ids are free-form so the settings UI can add AI tools without a code change;
/// only `copy` and `wiki` carry special routing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolId(String);

impl ToolId {
    pub const COPY: &'static str = "copy";
    pub const WIKI: &'static str = "wiki";
    pub const SUMMARIZE: &'static str = "summarize";
    pub const EXPLAIN: &'static str = "explain";

    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn kind(&self) -> ToolKind {
        match self.0.as_str() {
            Self::COPY => ToolKind::Copy,
            Self::WIKI => ToolKind::Wiki,
            _ => ToolKind::Ai,
        }
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ToolId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
