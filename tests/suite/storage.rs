//! File-backed store shared across pipeline restarts.

use std::sync::Arc;

use wiremock::MockServer;

use comfort_config::{ConfigStore, FileStorage, STATE_KEY, StorageScope};
use comfort_engine::{BackgroundEvent, InstallReason};
use comfort_types::{ApiKey, Point, ToolId};

use crate::common::{Harness, Shown, TEST_KEY, mount_completion};

fn file_store(dir: &std::path::Path) -> ConfigStore {
    ConfigStore::new(Arc::new(FileStorage::open(dir).unwrap()))
}

#[tokio::test]
async fn key_saved_in_one_session_is_used_in_the_next() {
    let dir = tempfile::tempdir().unwrap();
    file_store(dir.path())
        .update_configuration(|config| config.api_key = ApiKey::parse(TEST_KEY))
        .unwrap();

    let wiki = MockServer::start().await;
    let openrouter = MockServer::start().await;
    mount_completion(&openrouter, "Persisted.").await;

    let harness = Harness::start(file_store(dir.path()), &wiki, &openrouter);
    harness.select_and_click("persist me", Point::new(500.0, 500.0), "summarize");
    assert_eq!(
        harness.surface.next_result().await,
        Shown::AiAnswer {
            tool: ToolId::from("summarize"),
            text: "Persisted.".into()
        }
    );
    harness.stop().await;

    let reopened = file_store(dir.path());
    assert_eq!(reopened.selection_count().unwrap(), 1);
    assert_eq!(reopened.selected_text().unwrap().as_deref(), Some("persist me"));
    assert_eq!(reopened.session_stats().unwrap().actions_run, 1);
}

#[tokio::test]
async fn install_seeds_once_and_keeps_user_edits() {
    let dir = tempfile::tempdir().unwrap();
    let wiki = MockServer::start().await;
    let openrouter = MockServer::start().await;

    let harness = Harness::start(file_store(dir.path()), &wiki, &openrouter);
    harness.bus.emit(BackgroundEvent::Installed {
        reason: InstallReason::Install,
    });
    harness.stop().await;

    let store = file_store(dir.path());
    assert!(store.backend().get(StorageScope::Local, STATE_KEY).unwrap().is_some());
    store
        .update_configuration(|config| config.api_key = ApiKey::parse(TEST_KEY))
        .unwrap();

    let harness = Harness::start(file_store(dir.path()), &wiki, &openrouter);
    harness.bus.emit(BackgroundEvent::Installed {
        reason: InstallReason::Install,
    });
    harness.stop().await;

    let config = file_store(dir.path()).configuration().unwrap();
    assert_eq!(config.api_key, ApiKey::parse(TEST_KEY));
}
