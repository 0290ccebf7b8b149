use comfort_config::StoreError;
use comfort_providers::{CompletionError, SearchError};
use comfort_types::TabId;

use crate::clipboard::ClipboardError;

/// Everything that can go wrong between a tool click and its rendered result.
///
/// None of these stop a context; each ends as a notification in the
/// originating tab (or a log line when there is no tab to tell).
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("Please add your OpenRouter API key in settings")]
    ConfigMissing,
    #[error("{0}")]
    Transport(String),
    #[error("{0}")]
    MalformedResponse(String),
    #[error("no listener for tab {0}")]
    DeliveryMiss(TabId),
    #[error("{0}")]
    ClipboardDenied(#[from] ClipboardError),
    #[error("{0}")]
    Store(#[from] StoreError),
}

impl ActionError {
    /// Notification text for AI-style tools.
    #[must_use]
    pub fn notification(&self) -> String {
        match self {
            Self::ConfigMissing => self.to_string(),
            _ => format!("Error: {self}"),
        }
    }
}

impl From<CompletionError> for ActionError {
    fn from(err: CompletionError) -> Self {
        match err {
            CompletionError::Malformed(_) => Self::MalformedResponse(err.to_string()),
            CompletionError::Transport(_)
            | CompletionError::Status { .. }
            | CompletionError::InvalidHeader { .. } => Self::Transport(err.to_string()),
        }
    }
}

impl From<SearchError> for ActionError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Malformed(_) => Self::MalformedResponse(err.to_string()),
            SearchError::Transport(_) | SearchError::Status { .. } => {
                Self::Transport(err.to_string())
            }
        }
    }
}
