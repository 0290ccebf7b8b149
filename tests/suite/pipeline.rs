//! Controller behavior that needs the whole pipeline around it.

use std::time::Duration;

use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use comfort_config::ConfigStore;
use comfort_engine::{BackgroundEvent, ContentEvent, MenuClick};
use comfort_types::{ExtensionState, Point, RuntimeMessage, RuntimeReply, TabMessage, ToolId};

use crate::common::{
    CHAT_PATH, Harness, Shown, TAB, chat_body, mount_completion, mount_wiki_search, store_with_key,
};

#[tokio::test]
async fn copy_stays_local() {
    let wiki = MockServer::start().await;
    let openrouter = MockServer::start().await;

    let harness = Harness::start(store_with_key(), &wiki, &openrouter);
    harness.select_and_click(" hello world ", Point::new(200.0, 200.0), "copy");

    assert_eq!(
        harness.surface.next_result().await,
        Shown::Notification("Copied to clipboard!".into())
    );
    assert_eq!(harness.clipboard.writes(), ["hello world"]);
    assert_eq!(harness.store.selection_count().unwrap(), 1);
    assert_eq!(harness.store.selected_text().unwrap().as_deref(), Some("hello world"));

    let store = harness.store.clone();
    harness.stop().await;
    assert_eq!(store.session_stats().unwrap().actions_run, 0);
    assert!(wiki.received_requests().await.unwrap().is_empty());
    assert!(openrouter.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn click_without_selection_asks_for_text() {
    let wiki = MockServer::start().await;
    let openrouter = MockServer::start().await;

    let harness = Harness::start(ConfigStore::in_memory(), &wiki, &openrouter);
    harness.surface.select("   ");
    harness.send(ContentEvent::SelectionChanged {
        pointer: Point::new(200.0, 200.0),
    });
    harness.send(ContentEvent::ToolClicked("wiki".into()));

    assert_eq!(
        harness.surface.next_result().await,
        Shown::Notification("Select some text first".into())
    );
    assert!(harness.surface.toolbar_positions().is_empty());
    harness.stop().await;
}

#[tokio::test]
async fn snapshot_is_consumed_by_the_click() {
    let wiki = MockServer::start().await;
    let openrouter = MockServer::start().await;
    mount_wiki_search(&wiki, "first", &[]).await;

    let harness = Harness::start(ConfigStore::in_memory(), &wiki, &openrouter);
    harness.select_and_click("first", Point::new(200.0, 200.0), "wiki");
    assert_eq!(
        harness.surface.next_result().await,
        Shown::Notification("No Wikipedia results found".into())
    );

    harness.send(ContentEvent::ToolClicked("wiki".into()));
    assert_eq!(
        harness.surface.next_result().await,
        Shown::Notification("Select some text first".into())
    );
    harness.stop().await;
}

#[tokio::test]
async fn menu_click_renders_in_its_tab() {
    let wiki = MockServer::start().await;
    let openrouter = MockServer::start().await;
    mount_completion(&openrouter, "Menu answer.").await;

    let harness = Harness::start(store_with_key(), &wiki, &openrouter);
    harness.bus.emit(BackgroundEvent::MenuClicked(MenuClick {
        menu_item_id: "comfort-summarize".into(),
        selection_text: Some("from the context menu".into()),
        tab_id: Some(TAB),
    }));

    assert_eq!(
        harness.surface.next_result().await,
        Shown::AiAnswer {
            tool: "summarize".into(),
            text: "Menu answer.".into()
        }
    );
    harness.stop().await;
}

#[tokio::test]
async fn settings_save_reaches_every_reader() {
    let wiki = MockServer::start().await;
    let openrouter = MockServer::start().await;

    let harness = Harness::start(ConfigStore::in_memory(), &wiki, &openrouter);
    let mut state = ExtensionState::default();
    for tool in &mut state.tools {
        tool.active = tool.id.as_str() != "explain";
    }

    let reply = harness
        .bus
        .request(None, &RuntimeMessage::SaveSettings { state: state.clone() })
        .await;
    assert_eq!(reply, Some(RuntimeReply::ok()));
    let reply = harness.bus.request(None, &RuntimeMessage::GetSettings).await;
    assert_eq!(reply, Some(RuntimeReply::Settings { settings: state.clone() }));

    assert!(
        harness
            .bus
            .send_to_tab(TAB, TabMessage::UpdateState { state })
            .is_delivered()
    );
    tokio::time::timeout(Duration::from_secs(5), async {
        while harness.surface.toolbar_renders().len() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("toolbar re-rendered");

    harness.send(ContentEvent::SettingsClicked);
    assert_eq!(harness.surface.next_result().await, Shown::Settings);

    let renders = harness.surface.toolbar_renders();
    assert_eq!(renders.len(), 2);
    assert!(renders[0].contains(&"explain".to_string()));
    assert!(!renders[1].contains(&"explain".to_string()));
    harness.stop().await;
}

#[tokio::test]
async fn late_result_renders_after_toolbar_is_reshown() {
    let wiki = MockServer::start().await;
    let openrouter = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(body_string_contains("summarize: slow passage"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_body("Slow answer."))
                .set_delay(Duration::from_millis(500)),
        )
        .expect(1)
        .mount(&openrouter)
        .await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(body_string_contains("summarize: fresh passage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("Fast answer.")))
        .expect(1)
        .mount(&openrouter)
        .await;

    let harness = Harness::start(store_with_key(), &wiki, &openrouter);
    harness.select_and_click("slow passage", Point::new(300.0, 300.0), "summarize");
    harness.select_and_click("fresh passage", Point::new(700.0, 500.0), "summarize");

    assert_eq!(
        harness.surface.next_result().await,
        Shown::AiAnswer {
            tool: ToolId::from("summarize"),
            text: "Fast answer.".into()
        }
    );
    assert_eq!(
        harness.surface.next_result().await,
        Shown::AiAnswer {
            tool: ToolId::from("summarize"),
            text: "Slow answer.".into()
        }
    );
    assert_eq!(
        harness.surface.toolbar_positions(),
        [Point::new(180.0, 205.0), Point::new(580.0, 405.0)]
    );
    harness.stop().await;
}
