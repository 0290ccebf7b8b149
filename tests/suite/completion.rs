//! AI tools against a mock OpenRouter.

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use comfort_config::ConfigStore;
use comfort_types::{ModelName, Point, ToolId};

use crate::common::{CHAT_PATH, Harness, Shown, TEST_KEY, chat_body, store_with_key};

#[tokio::test]
async fn summarize_sends_prompt_and_renders_answer() {
    let wiki = MockServer::start().await;
    let openrouter = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(header("authorization", format!("Bearer {TEST_KEY}").as_str()))
        .and(header("x-title", "Comfort Kit"))
        .and(body_json(json!({
            "model": "xiaomi/mimo-v2-flash:free",
            "messages": [{ "role": "user", "content": "summarize: The quick brown fox" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("A fox jumps.")))
        .expect(1)
        .mount(&openrouter)
        .await;

    let harness = Harness::start(store_with_key(), &wiki, &openrouter);
    harness.select_and_click("The quick brown fox", Point::new(400.0, 400.0), "summarize");

    assert_eq!(
        harness.surface.next_result().await,
        Shown::AiAnswer {
            tool: ToolId::from("summarize"),
            text: "A fox jumps.".into()
        }
    );
    harness.stop().await;
}

#[tokio::test]
async fn custom_model_is_used_per_request() {
    let wiki = MockServer::start().await;
    let openrouter = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(body_json(json!({
            "model": "meta/llama-free",
            "messages": [{ "role": "user", "content": "explain: borrow checker" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("It checks borrows.")))
        .expect(1)
        .mount(&openrouter)
        .await;

    let store = store_with_key();
    let harness = Harness::start(store.clone(), &wiki, &openrouter);
    store
        .update_configuration(|config| config.model = ModelName::parse("meta/llama-free"))
        .unwrap();
    harness.select_and_click("borrow checker", Point::new(400.0, 400.0), "explain");

    assert_eq!(
        harness.surface.next_result().await,
        Shown::AiAnswer {
            tool: ToolId::from("explain"),
            text: "It checks borrows.".into()
        }
    );
    harness.stop().await;
}

#[tokio::test]
async fn unauthorized_key_shows_status_error() {
    let wiki = MockServer::start().await;
    let openrouter = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "No auth credentials found", "code": 401 }
        })))
        .mount(&openrouter)
        .await;

    let harness = Harness::start(store_with_key(), &wiki, &openrouter);
    harness.select_and_click("some text", Point::new(400.0, 400.0), "explain");

    assert_eq!(
        harness.surface.next_result().await,
        Shown::Notification("Error: API error: 401".into())
    );
    harness.stop().await;
}

#[tokio::test]
async fn missing_key_never_reaches_network() {
    let wiki = MockServer::start().await;
    let openrouter = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("unused")))
        .expect(0)
        .mount(&openrouter)
        .await;

    let harness = Harness::start(ConfigStore::in_memory(), &wiki, &openrouter);
    harness.select_and_click("some text", Point::new(400.0, 400.0), "summarize");

    assert_eq!(
        harness.surface.next_result().await,
        Shown::Notification("Please add your OpenRouter API key in settings".into())
    );
    harness.stop().await;
}

#[tokio::test]
async fn repeated_requests_render_identical_results() {
    let wiki = MockServer::start().await;
    let openrouter = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("Same answer.")))
        .expect(2)
        .mount(&openrouter)
        .await;

    let harness = Harness::start(store_with_key(), &wiki, &openrouter);
    harness.select_and_click("idempotent", Point::new(400.0, 400.0), "summarize");
    let first = harness.surface.next_result().await;
    harness.select_and_click("idempotent", Point::new(400.0, 400.0), "summarize");
    let second = harness.surface.next_result().await;

    assert_eq!(first, second);
    harness.stop().await;
}
