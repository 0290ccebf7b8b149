//! Shared test utilities and fixtures
//!
//! Mock MediaWiki and OpenRouter servers, a recording page surface, and a
//! harness that wires a full pipeline (controller, bus, coordinator, router)
//! against them.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use comfort_config::ConfigStore;
use comfort_engine::{
    ActionRouter, BackgroundEvent, ClipboardError, ClipboardWriter, ContentEvent, Coordinator,
    MessageBus, PageSurface, SelectionController, ToolbarItem,
};
use comfort_providers::{OpenRouterClient, WikipediaSearch, http_client};
use comfort_types::{ApiKey, Point, Size, TabId, ToolId, Viewport, WikiItem};

pub const TAB: TabId = TabId::new(7);
pub const TEST_KEY: &str = "sk-or-test";

pub const WIKI_PATH: &str = "/w/api.php";
pub const CHAT_PATH: &str = "/api/v1/chat/completions";

const RESULT_TIMEOUT: Duration = Duration::from_secs(5);

pub fn wiki_endpoint(server: &MockServer) -> Url {
    Url::parse(&format!("{}{WIKI_PATH}", server.uri())).unwrap()
}

pub fn chat_endpoint(server: &MockServer) -> Url {
    Url::parse(&format!("{}{CHAT_PATH}", server.uri())).unwrap()
}

/// Mount a `list=search` response for exactly `query`.
pub async fn mount_wiki_search(server: &MockServer, query: &str, hits: &[(&str, &str)]) {
    let search: Vec<Value> = hits
        .iter()
        .map(|(title, snippet)| json!({ "title": title, "snippet": snippet }))
        .collect();
    Mock::given(method("GET"))
        .and(path(WIKI_PATH))
        .and(query_param("list", "search"))
        .and(query_param("srsearch", query))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "batchcomplete": "",
            "query": { "search": search }
        })))
        .mount(server)
        .await;
}

/// Mount a `prop=pageimages` response; titles without a URL get no thumbnail.
pub async fn mount_wiki_thumbnails(server: &MockServer, pages: &[(&str, Option<&str>)]) {
    let mut map = serde_json::Map::new();
    for (index, (title, source)) in pages.iter().enumerate() {
        let mut page = json!({ "pageid": index + 1, "title": title });
        if let Some(source) = source {
            page["thumbnail"] = json!({ "source": source, "width": 400, "height": 300 });
        }
        map.insert((index + 1).to_string(), page);
    }
    Mock::given(method("GET"))
        .and(path(WIKI_PATH))
        .and(query_param("prop", "pageimages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": { "pages": map }
        })))
        .mount(server)
        .await;
}

pub fn chat_body(content: &str) -> Value {
    json!({
        "id": "gen-test",
        "model": "xiaomi/mimo-v2-flash:free",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

/// Mount a successful chat completion.
pub async fn mount_completion(server: &MockServer, content: &str) {
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(content)))
        .mount(server)
        .await;
}

/// What the page showed the user, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Shown {
    Notification(String),
    WikiResults(Vec<WikiItem>),
    AiAnswer { tool: ToolId, text: String },
    Settings,
}

/// Page surface that records results and lets tests await them.
pub struct RecordingSurface {
    selection: Mutex<String>,
    toolbar_positions: Mutex<Vec<Point>>,
    toolbar_renders: Mutex<Vec<Vec<String>>>,
    results: Mutex<VecDeque<Shown>>,
    arrived: Notify,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self {
            selection: Mutex::new(String::new()),
            toolbar_positions: Mutex::default(),
            toolbar_renders: Mutex::default(),
            results: Mutex::default(),
            arrived: Notify::new(),
        }
    }

    pub fn select(&self, text: &str) {
        *self.selection.lock().unwrap() = text.to_string();
    }

    pub fn toolbar_positions(&self) -> Vec<Point> {
        self.toolbar_positions.lock().unwrap().clone()
    }

    /// Labels of every toolbar render, `|` for dividers.
    pub fn toolbar_renders(&self) -> Vec<Vec<String>> {
        self.toolbar_renders.lock().unwrap().clone()
    }

    /// Wait for the next result shown on the page.
    pub async fn next_result(&self) -> Shown {
        loop {
            if let Some(shown) = self.results.lock().unwrap().pop_front() {
                return shown;
            }
            tokio::time::timeout(RESULT_TIMEOUT, self.arrived.notified())
                .await
                .expect("no result shown within timeout");
        }
    }

    /// Results shown so far that nobody has awaited.
    pub fn pending_results(&self) -> Vec<Shown> {
        self.results.lock().unwrap().iter().cloned().collect()
    }

    fn push(&self, shown: Shown) {
        self.results.lock().unwrap().push_back(shown);
        self.arrived.notify_one();
    }
}

impl PageSurface for RecordingSurface {
    fn selection_text(&self) -> String {
        self.selection.lock().unwrap().clone()
    }

    fn viewport(&self) -> Viewport {
        Viewport::new(1280.0, 800.0)
    }

    fn toolbar_size(&self) -> Size {
        Size::new(240.0, 44.0)
    }

    fn contains_toolbar(&self, _point: Point) -> bool {
        false
    }

    fn show_toolbar(&self, position: Point) {
        self.toolbar_positions.lock().unwrap().push(position);
    }

    fn hide_toolbar(&self) {}

    fn render_toolbar(&self, items: &[ToolbarItem<'_>]) {
        let labels = items
            .iter()
            .filter_map(|item| match item {
                ToolbarItem::Tool(tool) => Some(tool.id.to_string()),
                ToolbarItem::Divider => Some("|".to_string()),
                ToolbarItem::Settings | ToolbarItem::Close => None,
            })
            .collect();
        self.toolbar_renders.lock().unwrap().push(labels);
    }

    fn show_notification(&self, message: &str, _duration: Duration) {
        self.push(Shown::Notification(message.to_string()));
    }

    fn show_wiki_results(&self, items: &[WikiItem]) {
        self.push(Shown::WikiResults(items.to_vec()));
    }

    fn show_ai_answer(&self, tool: &ToolId, text: &str) {
        self.push(Shown::AiAnswer {
            tool: tool.clone(),
            text: text.to_string(),
        });
    }

    fn open_settings(&self) {
        self.push(Shown::Settings);
    }
}

#[derive(Default)]
pub struct RecordingClipboard {
    writes: Mutex<Vec<String>>,
}

impl RecordingClipboard {
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }
}

impl ClipboardWriter for RecordingClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        self.writes.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

pub fn store_with_key() -> ConfigStore {
    let store = ConfigStore::in_memory();
    store
        .update_configuration(|config| config.api_key = ApiKey::parse(TEST_KEY))
        .unwrap();
    store
}

/// One tab plus the background side, all talking over a real bus to mock
/// servers.
pub struct Harness {
    pub store: ConfigStore,
    pub bus: Arc<MessageBus>,
    pub surface: Arc<RecordingSurface>,
    pub clipboard: Arc<RecordingClipboard>,
    events: mpsc::UnboundedSender<ContentEvent>,
    controller: JoinHandle<()>,
    coordinator: JoinHandle<()>,
}

impl Harness {
    pub fn start(store: ConfigStore, wiki: &MockServer, openrouter: &MockServer) -> Self {
        let search = WikipediaSearch::new(http_client().clone()).with_endpoint(wiki_endpoint(wiki));
        let completion =
            OpenRouterClient::new(http_client().clone()).with_endpoint(chat_endpoint(openrouter));

        let (bus, inbox) = MessageBus::new();
        let router = Arc::new(ActionRouter::new(
            store.clone(),
            Arc::new(search),
            Arc::new(completion),
            Arc::clone(&bus),
        ));
        let coordinator = tokio::spawn(Coordinator::new(router, inbox).run());

        let surface = Arc::new(RecordingSurface::new());
        let clipboard = Arc::new(RecordingClipboard::default());
        let (events, controller) = SelectionController::new(
            TAB,
            Arc::clone(&surface) as Arc<dyn PageSurface>,
            store.clone(),
            Arc::clone(&bus),
            Arc::clone(&clipboard) as Arc<dyn ClipboardWriter>,
        )
        .spawn();

        Self {
            store,
            bus,
            surface,
            clipboard,
            events,
            controller,
            coordinator,
        }
    }

    pub fn send(&self, event: ContentEvent) {
        self.events.send(event).unwrap();
    }

    /// Select `text`, release the pointer at `pointer`, then click `tool`.
    pub fn select_and_click(&self, text: &str, pointer: Point, tool: &str) {
        self.surface.select(text);
        self.send(ContentEvent::SelectionChanged { pointer });
        self.send(ContentEvent::ToolClicked(ToolId::from(tool)));
    }

    pub async fn stop(self) {
        drop(self.events);
        self.controller.await.unwrap();
        self.bus.emit(BackgroundEvent::Shutdown);
        self.coordinator.await.unwrap();
    }
}
