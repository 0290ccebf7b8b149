//! The background coordinator loop.

use std::ops::ControlFlow;
use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinSet;

use comfort_config::ConfigStore;
use comfort_types::{RuntimeMessage, RuntimeReply, TabId, ToolInvocationRequest};

use crate::bus::{BackgroundEvent, Envelope, Inbound, InstallReason, RouterInbox};
use crate::menu::MenuClick;
use crate::router::ActionRouter;

/// Owns the router inbox. Each tool request runs as its own task while the loop
/// keeps accepting messages.
pub struct Coordinator {
    router: Arc<ActionRouter>,
    inbox: RouterInbox,
    in_flight: JoinSet<()>,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("in_flight", &self.in_flight.len())
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    pub fn new(router: Arc<ActionRouter>, inbox: RouterInbox) -> Self {
        Self {
            router,
            inbox,
            in_flight: JoinSet::new(),
        }
    }

    fn store(&self) -> &ConfigStore {
        self.router.store()
    }

    /// Run until [`BackgroundEvent::Shutdown`] or until every sender is gone,
    /// then wait for in-flight requests to finish.
    pub async fn run(mut self) {
        tracing::info!("Background coordinator started");
        loop {
            tokio::select! {
                envelope = self.inbox.recv() => {
                    let Some(envelope) = envelope else { break };
                    if self.dispatch(envelope).is_break() {
                        break;
                    }
                }
                Some(joined) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!("Routing task failed: {e}");
                    }
                }
            }
        }

        while let Some(joined) = self.in_flight.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Routing task failed: {e}");
            }
        }
        tracing::info!("Background coordinator stopped");
    }

    /// Handle one envelope. Replies, when a slot is present, are sent before
    /// any spawned work completes.
    pub fn dispatch(&mut self, envelope: Envelope) -> ControlFlow<()> {
        let Envelope {
            sender_tab,
            payload,
            reply,
        } = envelope;

        match payload {
            Inbound::Runtime(value) => {
                let response = self.handle_runtime(sender_tab, value);
                if let Some(slot) = reply
                    && slot.send(response).is_err()
                {
                    tracing::debug!("Requester went away before the reply");
                }
                ControlFlow::Continue(())
            }
            Inbound::Event(event) => self.handle_event(event),
        }
    }

    fn handle_runtime(&mut self, sender_tab: Option<TabId>, value: Value) -> RuntimeReply {
        let message = match serde_json::from_value::<RuntimeMessage>(value) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!("Ignoring undecodable runtime message: {e}");
                return RuntimeReply::unknown_action();
            }
        };

        match message {
            RuntimeMessage::HandleToolAction { tool_id, text } => {
                self.spawn_route(ToolInvocationRequest {
                    tool_id,
                    text,
                    origin_tab: sender_tab,
                });
                RuntimeReply::ok()
            }
            RuntimeMessage::GetSettings => match self.store().load_state() {
                Ok(settings) => RuntimeReply::Settings { settings },
                Err(e) => {
                    tracing::warn!("Failed to read settings: {e}");
                    RuntimeReply::Error {
                        error: e.to_string(),
                    }
                }
            },
            RuntimeMessage::SaveSettings { state } => match self.store().save_state(&state) {
                Ok(()) => RuntimeReply::ok(),
                Err(e) => {
                    tracing::warn!("Failed to save settings: {e}");
                    RuntimeReply::Error {
                        error: e.to_string(),
                    }
                }
            },
        }
    }

    fn handle_event(&mut self, event: BackgroundEvent) -> ControlFlow<()> {
        match event {
            BackgroundEvent::Installed { reason } => self.on_installed(reason),
            BackgroundEvent::MenuClicked(click) => self.on_menu_click(click),
            BackgroundEvent::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    fn on_installed(&self, reason: InstallReason) {
        if reason != InstallReason::Install {
            tracing::debug!(?reason, "Keeping stored settings");
            return;
        }
        match self.store().seed_defaults() {
            Ok(true) => tracing::info!("Seeded default settings"),
            Ok(false) => tracing::debug!("Settings already present; not seeding"),
            Err(e) => tracing::warn!("Failed to seed default settings: {e}"),
        }
    }

    fn on_menu_click(&mut self, click: MenuClick) {
        let id = click.menu_item_id.clone();
        match click.into_request() {
            Some(request) => self.spawn_route(request),
            None => tracing::debug!(menu_item = %id, "Menu click without selection ignored"),
        }
    }

    fn spawn_route(&mut self, request: ToolInvocationRequest) {
        let router = Arc::clone(&self.router);
        tracing::debug!(tool = %request.tool_id, tab = ?request.origin_tab, "Routing tool request");
        self.in_flight.spawn(async move {
            if let Err(e) = router.route(request).await {
                tracing::debug!("{e}");
            }
        });
    }
}
