//! Background-side tool routing.

use std::sync::Arc;

use comfort_config::ConfigStore;
use comfort_providers::{CompletionBackend, CompletionRequest, SearchBackend};
use comfort_types::{ToolInvocationRequest, ToolKind, ToolResult};

use crate::bus::{Delivery, MessageBus};
use crate::error::ActionError;
use crate::{COPIED_MESSAGE, NO_WIKI_RESULTS_MESSAGE, WIKI_FAILED_MESSAGE};

/// Turns a [`ToolInvocationRequest`] into a [`ToolResult`] and delivers it to
/// the tab the request came from.
///
/// Configuration is re-read from the store for every request.
pub struct ActionRouter {
    store: ConfigStore,
    search: Arc<dyn SearchBackend>,
    completion: Arc<dyn CompletionBackend>,
    bus: Arc<MessageBus>,
}

impl std::fmt::Debug for ActionRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRouter")
            .field("store", &self.store)
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

impl ActionRouter {
    pub fn new(
        store: ConfigStore,
        search: Arc<dyn SearchBackend>,
        completion: Arc<dyn CompletionBackend>,
        bus: Arc<MessageBus>,
    ) -> Self {
        Self {
            store,
            search,
            completion,
            bus,
        }
    }

    #[must_use]
    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    #[must_use]
    pub fn bus(&self) -> &Arc<MessageBus> {
        &self.bus
    }

    /// Compute the result for `request`. Never fails: every error becomes a
    /// [`ToolResult::Notification`].
    pub async fn resolve(&self, request: &ToolInvocationRequest) -> ToolResult {
        let tool = &request.tool_id;
        match tool.kind() {
            ToolKind::Copy => ToolResult::notification(COPIED_MESSAGE),
            ToolKind::Wiki => match self.search.search(&request.text).await {
                Ok(items) if items.is_empty() => ToolResult::notification(NO_WIKI_RESULTS_MESSAGE),
                Ok(items) => ToolResult::WikiResults { items },
                Err(e) => {
                    tracing::warn!(%tool, "Wikipedia search failed: {e}");
                    ToolResult::notification(WIKI_FAILED_MESSAGE)
                }
            },
            ToolKind::Ai => match self.complete(request).await {
                Ok(text) => ToolResult::AiAnswer {
                    tool_id: tool.clone(),
                    text,
                },
                Err(e) => {
                    tracing::warn!(%tool, "Completion failed: {e}");
                    ToolResult::notification(e.notification())
                }
            },
        }
    }

    async fn complete(&self, request: &ToolInvocationRequest) -> Result<String, ActionError> {
        let config = self.store.configuration()?;
        let api_key = config.api_key.as_ref().ok_or(ActionError::ConfigMissing)?;
        let answer = self
            .completion
            .complete(CompletionRequest {
                tool_id: &request.tool_id,
                text: &request.text,
                model: &config.model,
                api_key,
            })
            .await?;
        Ok(answer)
    }

    /// Resolve and deliver. A request without an origin tab is resolved and
    /// logged but has nowhere to go.
    pub async fn route(&self, request: ToolInvocationRequest) -> Result<(), ActionError> {
        let result = self.resolve(&request).await;

        if let Err(e) = self.store.record_stats(|stats| stats.actions_run += 1) {
            tracing::warn!("Failed to record action stats: {e}");
        }

        let Some(tab) = request.origin_tab else {
            tracing::info!(tool = %request.tool_id, ?result, "Tool result has no origin tab");
            return Ok(());
        };

        match self.bus.send_to_tab(tab, result.into_message()) {
            Delivery::Delivered => Ok(()),
            Delivery::Missed => Err(ActionError::DeliveryMiss(tab)),
        }
    }
}
