//! The in-page content controller.
//!
//! One controller per tab. It owns the floating toolbar, keeps the most recent
//! [`SelectionSnapshot`] and hands tool clicks to the router over the bus. All page
//! input arrives as [`ContentEvent`]s through [`SelectionController::dispatch`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use comfort_config::ConfigStore;
use comfort_types::{
    Point, RuntimeMessage, SelectionSnapshot, Size, TabId, TabMessage, ToolDescriptor, ToolId,
    ToolKind, Viewport, WikiItem,
};

use crate::bus::{MessageBus, TabListener};
use crate::clipboard::ClipboardWriter;
use crate::error::ActionError;
use crate::toolbar::{ToolbarItem, compute_toolbar_position, toolbar_items};
use crate::{
    COPIED_MESSAGE, COPY_FAILED_MESSAGE, DEFAULT_NOTIFICATION_DURATION, SELECT_TEXT_FIRST_MESSAGE,
};

/// Host page as seen by the controller.
pub trait PageSurface: Send + Sync {
    /// Live selection text, untrimmed.
    fn selection_text(&self) -> String;
    fn viewport(&self) -> Viewport;
    fn toolbar_size(&self) -> Size;
    /// Whether `point` falls on the toolbar (or a control inside it).
    fn contains_toolbar(&self, point: Point) -> bool;

    fn show_toolbar(&self, position: Point);
    fn hide_toolbar(&self);
    fn render_toolbar(&self, items: &[ToolbarItem<'_>]);

    /// Transient toast, gone after `duration`.
    fn show_notification(&self, message: &str, duration: Duration);
    fn show_wiki_results(&self, items: &[WikiItem]);
    fn show_ai_answer(&self, tool: &ToolId, text: &str);
    fn open_settings(&self);
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContentEvent {
    /// Pointer released, possibly ending a selection.
    SelectionChanged { pointer: Point },
    PointerDown { pointer: Point },
    ToolClicked(ToolId),
    CloseClicked,
    SettingsClicked,
    Inbound(TabMessage),
}

pub struct SelectionController {
    tab: TabId,
    surface: Arc<dyn PageSurface>,
    store: ConfigStore,
    bus: Arc<MessageBus>,
    clipboard: Arc<dyn ClipboardWriter>,
    tools: Vec<ToolDescriptor>,
    snapshot: Option<SelectionSnapshot>,
    notification_duration: Duration,
    toolbar_visible: bool,
}

impl std::fmt::Debug for SelectionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionController")
            .field("tab", &self.tab)
            .field("snapshot", &self.snapshot)
            .field("toolbar_visible", &self.toolbar_visible)
            .finish_non_exhaustive()
    }
}

impl SelectionController {
    /// Loads the tool list from the store (defaults when unreadable) and renders
    /// the toolbar once. The toolbar starts hidden.
    pub fn new(
        tab: TabId,
        surface: Arc<dyn PageSurface>,
        store: ConfigStore,
        bus: Arc<MessageBus>,
        clipboard: Arc<dyn ClipboardWriter>,
    ) -> Self {
        let tools = match store.load_state() {
            Ok(state) => state.tools,
            Err(e) => {
                tracing::warn!(%tab, "Failed to load settings, using defaults: {e}");
                comfort_types::default_tools()
            }
        };
        let controller = Self {
            tab,
            surface,
            store,
            bus,
            clipboard,
            tools,
            snapshot: None,
            notification_duration: DEFAULT_NOTIFICATION_DURATION,
            toolbar_visible: false,
        };
        controller.render_toolbar();
        controller
    }

    #[must_use]
    pub fn with_notification_duration(mut self, duration: Duration) -> Self {
        self.notification_duration = duration;
        self
    }

    #[must_use]
    pub fn tab(&self) -> TabId {
        self.tab
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<&SelectionSnapshot> {
        self.snapshot.as_ref()
    }

    #[must_use]
    pub fn toolbar_visible(&self) -> bool {
        self.toolbar_visible
    }

    #[must_use]
    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    /// Register the tab's listener and run the controller on its own task.
    /// Dropping the returned sender tears the controller down.
    pub fn spawn(self) -> (mpsc::UnboundedSender<ContentEvent>, JoinHandle<()>) {
        let listener = self.bus.register_tab(self.tab);
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(self.run(rx, listener));
        (tx, handle)
    }

    /// Handle page events and inbound tab messages until the page goes away.
    pub async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<ContentEvent>,
        mut listener: TabListener,
    ) {
        tracing::debug!(tab = %self.tab, "Content controller started");
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.dispatch(event),
                    None => break,
                },
                Some(message) = listener.recv() => self.dispatch(ContentEvent::Inbound(message)),
            }
        }
        tracing::debug!(tab = %self.tab, "Content controller stopped");
    }

    pub fn dispatch(&mut self, event: ContentEvent) {
        match event {
            ContentEvent::SelectionChanged { pointer } => self.on_selection_changed(pointer),
            ContentEvent::PointerDown { pointer } => self.on_pointer_down(pointer),
            ContentEvent::ToolClicked(tool) => self.on_tool_clicked(&tool),
            ContentEvent::CloseClicked => {
                self.hide_toolbar();
                self.snapshot = None;
            }
            ContentEvent::SettingsClicked => {
                self.hide_toolbar();
                self.surface.open_settings();
            }
            ContentEvent::Inbound(message) => self.on_message(message),
        }
    }

    fn on_selection_changed(&mut self, pointer: Point) {
        if self.surface.contains_toolbar(pointer) {
            return;
        }

        let text = self.surface.selection_text();
        let Ok(snapshot) = SelectionSnapshot::capture(&text, self.tab) else {
            self.hide_toolbar();
            self.snapshot = None;
            return;
        };

        if let Err(e) = self.store.set_selected_text(snapshot.text()) {
            tracing::warn!(tab = %self.tab, "Failed to persist selected text: {e}");
        }
        self.snapshot = Some(snapshot);

        let position =
            compute_toolbar_position(pointer, self.surface.toolbar_size(), self.surface.viewport());
        self.surface.show_toolbar(position);
        self.toolbar_visible = true;
    }

    fn on_pointer_down(&mut self, pointer: Point) {
        if !self.surface.contains_toolbar(pointer)
            && self.surface.selection_text().trim().is_empty()
        {
            self.hide_toolbar();
            self.snapshot = None;
        }
    }

    fn on_tool_clicked(&mut self, tool: &ToolId) {
        self.hide_toolbar();

        let Some(snapshot) = self.snapshot.as_ref() else {
            self.notify(SELECT_TEXT_FIRST_MESSAGE);
            return;
        };
        self.record_click(snapshot.text());

        if tool.kind() == ToolKind::Copy {
            let outcome = self.clipboard.write_text(snapshot.text());
            match outcome {
                Ok(()) => self.notify(COPIED_MESSAGE),
                Err(e) => {
                    tracing::warn!(tab = %self.tab, "{}", ActionError::from(e));
                    self.notify(COPY_FAILED_MESSAGE);
                }
            }
            return;
        }

        let Some(snapshot) = self.snapshot.take() else {
            return;
        };
        let request = snapshot.into_request(tool.clone());
        let message = RuntimeMessage::HandleToolAction {
            tool_id: request.tool_id,
            text: request.text,
        };
        self.bus.send_to_router(Some(self.tab), &message);
    }

    /// Best-effort click bookkeeping; failures never block the tool.
    fn record_click(&self, text: &str) {
        if let Err(e) = self.store.set_selected_text(text) {
            tracing::warn!(tab = %self.tab, "Failed to persist selected text: {e}");
        }
        if let Err(e) = self.store.increment_selection_count() {
            tracing::warn!(tab = %self.tab, "Failed to update selection count: {e}");
        }
    }

    fn on_message(&mut self, message: TabMessage) {
        match message {
            TabMessage::ShowNotification { message } => self.notify(&message),
            TabMessage::ShowWikiResults { results } => self.surface.show_wiki_results(&results),
            TabMessage::ShowAiResult { mode, text } => self.surface.show_ai_answer(&mode, &text),
            TabMessage::UpdateState { state } => {
                self.tools = state.tools;
                self.render_toolbar();
            }
        }
    }

    fn notify(&self, message: &str) {
        self.surface.show_notification(message, self.notification_duration);
    }

    fn render_toolbar(&self) {
        self.surface.render_toolbar(&toolbar_items(&self.tools));
    }

    fn hide_toolbar(&mut self) {
        self.surface.hide_toolbar();
        self.toolbar_visible = false;
    }
}
