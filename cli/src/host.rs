//! Headless page host that renders toolbar output as plain terminal lines.

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use scraper::Html;
use tokio::sync::Notify;

use comfort_engine::{PageSurface, ToolbarItem};
use comfort_types::{Point, Size, ToolId, Viewport, WikiItem};

/// Terminal stand-in for a browser tab.
///
/// Everything user-visible goes through `out`, one line per surface call.
/// Result calls (toasts, wiki cards, AI answers, settings) also wake
/// [`TerminalSurface::settled`] so the caller can stop waiting.
pub struct TerminalSurface {
    selection: Mutex<String>,
    toolbar_at: Mutex<Option<Point>>,
    viewport: Viewport,
    toolbar_size: Size,
    out: Mutex<Box<dyn Write + Send>>,
    settled: Notify,
}

impl TerminalSurface {
    pub const VIEWPORT: Viewport = Viewport::new(1280.0, 800.0);
    pub const TOOLBAR_SIZE: Size = Size::new(320.0, 44.0);

    pub fn stdout() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            selection: Mutex::new(String::new()),
            toolbar_at: Mutex::new(None),
            viewport: Self::VIEWPORT,
            toolbar_size: Self::TOOLBAR_SIZE,
            out: Mutex::new(out),
            settled: Notify::new(),
        }
    }

    /// Replace the live selection, as if the user dragged over `text`.
    pub fn select(&self, text: &str) {
        *self
            .selection
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = text.to_string();
    }

    /// Wait for the next result call. `false` on timeout.
    pub async fn settled(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.settled.notified())
            .await
            .is_ok()
    }

    fn line(&self, text: &str) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(out, "{text}").and_then(|()| out.flush()) {
            tracing::warn!("Failed to write to terminal: {e}");
        }
    }

    fn finish(&self) {
        self.settled.notify_one();
    }
}

impl std::fmt::Debug for TerminalSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalSurface")
            .field("viewport", &self.viewport)
            .field("toolbar_size", &self.toolbar_size)
            .finish_non_exhaustive()
    }
}

/// Wikipedia snippets carry highlight markup; keep only the text.
pub fn plain_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text: String = fragment.root_element().text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn describe(item: &ToolbarItem<'_>) -> String {
    match item {
        ToolbarItem::Tool(tool) => format!("[{}]", tool.label),
        ToolbarItem::Divider => "|".to_string(),
        ToolbarItem::Settings => "[settings]".to_string(),
        ToolbarItem::Close => "[x]".to_string(),
    }
}

impl PageSurface for TerminalSurface {
    fn selection_text(&self) -> String {
        self.selection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn toolbar_size(&self) -> Size {
        self.toolbar_size
    }

    fn contains_toolbar(&self, point: Point) -> bool {
        let Some(origin) = *self
            .toolbar_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
        else {
            return false;
        };
        point.x >= origin.x
            && point.x <= origin.x + self.toolbar_size.width
            && point.y >= origin.y
            && point.y <= origin.y + self.toolbar_size.height
    }

    fn show_toolbar(&self, position: Point) {
        *self
            .toolbar_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(position);
        tracing::debug!(x = position.x, y = position.y, "Toolbar shown");
    }

    fn hide_toolbar(&self) {
        *self
            .toolbar_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
        tracing::debug!("Toolbar hidden");
    }

    fn render_toolbar(&self, items: &[ToolbarItem<'_>]) {
        let rendered: Vec<String> = items.iter().map(describe).collect();
        tracing::debug!(toolbar = %rendered.join(" "), "Toolbar rendered");
    }

    fn show_notification(&self, message: &str, duration: Duration) {
        tracing::debug!(?duration, "Notification");
        self.line(message);
        self.finish();
    }

    fn show_wiki_results(&self, items: &[WikiItem]) {
        for item in items {
            self.line(&format!("# {}", item.title));
            self.line(&format!("  {}", plain_text(&item.snippet)));
            if let Some(image) = &item.image_url {
                self.line(&format!("  image: {image}"));
            }
        }
        self.finish();
    }

    fn show_ai_answer(&self, tool: &ToolId, text: &str) {
        self.line(&format!("[{tool}]"));
        self.line(text);
        self.finish();
    }

    fn open_settings(&self) {
        self.line("Settings: use `comfort set-key` and `comfort set-model`");
        self.finish();
    }
}
