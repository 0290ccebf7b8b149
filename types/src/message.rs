//! Cross-context wire messages.
//!
//! Every message is a JSON object discriminated by its `action` field. Each
//! direction gets its own enum so a context can only receive what it is meant to
//! handle, and each enum is consumed by exactly one exhaustive dispatcher:
//!
//! | Enum | Direction |
//! |------|-----------|
//! | [`RuntimeMessage`] | UI surface / content controller -> background router |
//! | [`RuntimeReply`] | background router -> requester (optional reply slot) |
//! | [`TabMessage`] | background router / settings UI -> one tab |

use serde::{Deserialize, Serialize};

use crate::{ExtensionState, ToolId, WikiItem};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum RuntimeMessage {
    #[serde(rename_all = "camelCase")]
    HandleToolAction { tool_id: ToolId, text: String },
    GetSettings,
    SaveSettings { state: ExtensionState },
}

impl RuntimeMessage {
    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            Self::HandleToolAction { .. } => "handleToolAction",
            Self::GetSettings => "getSettings",
            Self::SaveSettings { .. } => "saveSettings",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuntimeReply {
    Ack { success: bool },
    Settings { settings: ExtensionState },
    Error { error: String },
}

impl RuntimeReply {
    pub const UNKNOWN_ACTION: &'static str = "Unknown action";

    #[must_use]
    pub const fn ok() -> Self {
        Self::Ack { success: true }
    }

    #[must_use]
    pub fn unknown_action() -> Self {
        Self::Error {
            error: Self::UNKNOWN_ACTION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum TabMessage {
    ShowNotification {
        message: String,
    },
    ShowWikiResults {
        results: Vec<WikiItem>,
    },
    #[serde(rename = "showAIResult")]
    ShowAiResult {
        mode: ToolId,
        text: String,
    },
    UpdateState {
        state: ExtensionState,
    },
}
