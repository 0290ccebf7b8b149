//! Comfort CLI - headless host for the selection toolbar pipeline.
//!
//! # Architecture
//!
//! One process plays every context a browser would host separately:
//!
//! ```text
//! TerminalSurface <- SelectionController --MessageBus--> Coordinator -> ActionRouter
//!       ^                                                                   |
//!       +----------------------- TabMessage -------------------------------+
//! ```
//!
//! `run` feeds a synthetic selection and tool click into a controller bound to
//! a single headless tab, then waits for the tab to render a result. State
//! persists in the file store, so `set-key` in one invocation is seen by `run`
//! in the next.

mod host;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::{
    fs::{self, OpenOptions},
    io,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::task::JoinHandle;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use comfort_config::{AppConfig, ConfigStore, FileStorage, ResolvedConfig};
use comfort_engine::{
    ActionRouter, BackgroundEvent, ContentEvent, Coordinator, FallbackClipboard, InstallReason,
    MenuClick, MessageBus, PageSurface, SelectionController,
};
use comfort_providers::openrouter::{DEFAULT_REFERER, DEFAULT_TITLE};
use comfort_providers::{OpenRouterClient, WikipediaSearch, http_client};
use comfort_types::{ApiKey, ModelName, Point, TabId, ToolId};

use host::TerminalSurface;

/// The only tab a headless session has.
const HEADLESS_TAB: TabId = TabId::new(1);

/// Where the synthetic selection ends, roughly mid-page.
const SELECTION_POINTER: Point = Point::new(640.0, 400.0);

/// Extra time on top of the completion timeout before `run` gives up.
const RESULT_GRACE: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "comfort")]
#[command(about = "Run Comfort Kit toolbar actions from the terminal")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Select TEXT and click a toolbar tool (copy, wiki, summarize, explain, ...)
    Run {
        tool: String,
        text: String,
    },

    /// Simulate a context menu click, e.g. `comfort-wiki`
    Menu {
        menu_item_id: String,
        text: String,
    },

    /// Seed default settings if none are stored yet
    Init,

    /// Store the OpenRouter API key (blank clears it)
    SetKey { key: String },

    /// Store the completion model
    SetModel { model: String },

    /// Print stored settings and counters
    Show,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_comfort_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // Results go to stdout; logs must not interleave with them.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .init();
    for warning in init_warnings {
        tracing::warn!("{warning}");
    }
}

fn open_comfort_log_file() -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in comfort_log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn comfort_log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.comfort/logs/comfort.log
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".comfort").join("logs").join("comfort.log"));
    }

    // Fallback: ./.comfort/logs/comfort.log
    candidates.push(PathBuf::from(".comfort").join("logs").join("comfort.log"));

    candidates
}

fn load_config() -> Result<ResolvedConfig> {
    let config = AppConfig::load()
        .context("failed to load config file")?
        .unwrap_or_default();
    config.resolve().context("invalid config file")
}

fn open_store(resolved: &ResolvedConfig) -> Result<ConfigStore> {
    let storage = FileStorage::open(resolved.storage_dir.clone()).with_context(|| {
        format!(
            "failed to open storage at {}",
            resolved.storage_dir.display()
        )
    })?;
    Ok(ConfigStore::new(Arc::new(storage)))
}

/// Background side of a session: bus, router and the coordinator task.
struct Pipeline {
    store: ConfigStore,
    bus: Arc<MessageBus>,
    coordinator: JoinHandle<()>,
}

impl Pipeline {
    fn start(resolved: &ResolvedConfig, store: ConfigStore) -> Self {
        let mut search = WikipediaSearch::new(http_client().clone())
            .with_limits(resolved.search_max_results, resolved.search_thumbnail_size);
        if let Some(endpoint) = &resolved.search_endpoint {
            search = search.with_endpoint(endpoint.clone());
        }

        let mut completion = OpenRouterClient::new(http_client().clone())
            .with_timeout(resolved.completion_timeout)
            .with_identity(
                resolved
                    .completion_referer
                    .as_deref()
                    .unwrap_or(DEFAULT_REFERER),
                resolved.completion_title.as_deref().unwrap_or(DEFAULT_TITLE),
            );
        if let Some(endpoint) = &resolved.completion_endpoint {
            completion = completion.with_endpoint(endpoint.clone());
        }

        let (bus, inbox) = MessageBus::new();
        let router = Arc::new(ActionRouter::new(
            store.clone(),
            Arc::new(search),
            Arc::new(completion),
            Arc::clone(&bus),
        ));
        let coordinator = tokio::spawn(Coordinator::new(router, inbox).run());

        Self {
            store,
            bus,
            coordinator,
        }
    }

    /// Spawn the headless tab's controller, rendering into `surface`.
    fn open_tab(
        &self,
        surface: &Arc<TerminalSurface>,
        resolved: &ResolvedConfig,
    ) -> (tokio::sync::mpsc::UnboundedSender<ContentEvent>, JoinHandle<()>) {
        SelectionController::new(
            HEADLESS_TAB,
            Arc::clone(surface) as Arc<dyn PageSurface>,
            self.store.clone(),
            Arc::clone(&self.bus),
            Arc::new(FallbackClipboard::platform_default()),
        )
        .with_notification_duration(resolved.notification_duration)
        .spawn()
    }

    async fn shutdown(self) {
        self.bus.emit(BackgroundEvent::Shutdown);
        if let Err(e) = self.coordinator.await {
            tracing::error!("Coordinator task failed: {e}");
        }
    }
}

async fn wait_for_result(surface: &TerminalSurface, timeout: Duration) -> Result<()> {
    tokio::select! {
        settled = surface.settled(timeout) => {
            if !settled {
                bail!("no result within {}s", timeout.as_secs());
            }
            Ok(())
        }
        _ = tokio::signal::ctrl_c() => bail!("interrupted"),
    }
}

async fn run_tool(
    resolved: &ResolvedConfig,
    store: ConfigStore,
    tool: &str,
    text: &str,
) -> Result<()> {
    let pipeline = Pipeline::start(resolved, store);
    let surface = Arc::new(TerminalSurface::stdout());
    surface.select(text);

    let (events, controller) = pipeline.open_tab(&surface, resolved);
    let tool = ToolId::new(tool.trim());
    tracing::info!(%tool, "Running tool from the command line");

    let sent = events
        .send(ContentEvent::SelectionChanged {
            pointer: SELECTION_POINTER,
        })
        .and_then(|()| events.send(ContentEvent::ToolClicked(tool)));
    let outcome = match sent {
        Ok(()) => wait_for_result(&surface, resolved.completion_timeout + RESULT_GRACE).await,
        Err(_) => Err(anyhow::anyhow!("content controller stopped early")),
    };

    drop(events);
    if let Err(e) = controller.await {
        tracing::error!("Content controller task failed: {e}");
    }
    pipeline.shutdown().await;
    outcome
}

async fn run_menu(
    resolved: &ResolvedConfig,
    store: ConfigStore,
    menu_item_id: String,
    text: String,
) -> Result<()> {
    let click = MenuClick {
        menu_item_id,
        selection_text: Some(text),
        tab_id: Some(HEADLESS_TAB),
    };
    if click.clone().into_request().is_none() {
        bail!("menu click needs a non-blank selection");
    }

    let pipeline = Pipeline::start(resolved, store);
    let surface = Arc::new(TerminalSurface::stdout());
    let (events, controller) = pipeline.open_tab(&surface, resolved);

    pipeline.bus.emit(BackgroundEvent::MenuClicked(click));
    let outcome = wait_for_result(&surface, resolved.completion_timeout + RESULT_GRACE).await;

    drop(events);
    if let Err(e) = controller.await {
        tracing::error!("Content controller task failed: {e}");
    }
    pipeline.shutdown().await;
    outcome
}

async fn init(resolved: &ResolvedConfig, store: ConfigStore) {
    let pipeline = Pipeline::start(resolved, store);
    pipeline.bus.emit(BackgroundEvent::Installed {
        reason: InstallReason::Install,
    });
    pipeline.shutdown().await;
    println!("Settings ready in {}", resolved.storage_dir.display());
}

/// Enough of the key to recognize it, never all of it.
fn redact(key: &ApiKey) -> String {
    let secret = key.expose_secret();
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 10 {
        return "<set>".to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

fn show(store: &ConfigStore) -> Result<()> {
    let state = store.load_state()?;
    let key = state
        .config
        .api_key
        .as_ref()
        .map_or_else(|| "<not set>".to_string(), redact);

    println!("api key:   {key}");
    println!("model:     {}", state.config.model);
    println!("tools:");
    for tool in &state.tools {
        let mark = if tool.active { "x" } else { " " };
        println!("  [{mark}] {:<10} {}", tool.id, tool.label);
    }

    let stats = store.session_stats()?;
    println!("selections: {}", store.selection_count()?);
    println!("actions:    {}", stats.actions_run);
    if let Some(text) = store.selected_text()? {
        println!("last selection: {text}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let resolved = load_config()?;
    let store = open_store(&resolved)?;

    match cli.command {
        Commands::Run { tool, text } => run_tool(&resolved, store, &tool, &text).await,
        Commands::Menu { menu_item_id, text } => {
            run_menu(&resolved, store, menu_item_id, text).await
        }
        Commands::Init => {
            init(&resolved, store).await;
            Ok(())
        }
        Commands::SetKey { key } => {
            let key = ApiKey::parse(&key);
            let cleared = key.is_none();
            store.update_configuration(|config| config.api_key = key)?;
            println!("{}", if cleared { "API key cleared" } else { "API key saved" });
            Ok(())
        }
        Commands::SetModel { model } => {
            let model = ModelName::parse(&model);
            println!("Model set to {model}");
            store.update_configuration(|config| config.model = model)?;
            Ok(())
        }
        Commands::Show => show(&store),
    }
}
