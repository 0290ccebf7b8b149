//! Wikipedia tool, end to end through the bus to the tab.

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use comfort_config::ConfigStore;
use comfort_types::{Point, WikiItem};

use crate::common::{Harness, Shown, WIKI_PATH, mount_wiki_search, mount_wiki_thumbnails};

#[tokio::test]
async fn octopus_lookup_merges_thumbnails() {
    let wiki = MockServer::start().await;
    let openrouter = MockServer::start().await;
    mount_wiki_search(
        &wiki,
        "octopus",
        &[
            ("Octopus", "An <span class=\"searchmatch\">octopus</span> is a mollusc"),
            ("Octopus card", "Stored-value card in Hong Kong"),
        ],
    )
    .await;
    mount_wiki_thumbnails(
        &wiki,
        &[
            ("Octopus", Some("https://upload.example/octopus.jpg")),
            ("Octopus card", None),
        ],
    )
    .await;

    let harness = Harness::start(ConfigStore::in_memory(), &wiki, &openrouter);
    harness.select_and_click("  octopus  ", Point::new(640.0, 400.0), "wiki");

    assert_eq!(
        harness.surface.next_result().await,
        Shown::WikiResults(vec![
            WikiItem {
                title: "Octopus".into(),
                snippet: "An <span class=\"searchmatch\">octopus</span> is a mollusc".into(),
                image_url: Some("https://upload.example/octopus.jpg".into()),
            },
            WikiItem {
                title: "Octopus card".into(),
                snippet: "Stored-value card in Hong Kong".into(),
                image_url: None,
            },
        ])
    );
    assert_eq!(harness.surface.toolbar_positions(), [Point::new(520.0, 305.0)]);
    assert!(openrouter.received_requests().await.unwrap().is_empty());

    harness.stop().await;
}

#[tokio::test]
async fn no_hits_shows_notification_without_thumbnail_call() {
    let wiki = MockServer::start().await;
    let openrouter = MockServer::start().await;
    mount_wiki_search(&wiki, "zzzxqj", &[]).await;
    Mock::given(method("GET"))
        .and(path(WIKI_PATH))
        .and(query_param("prop", "pageimages"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&wiki)
        .await;

    let harness = Harness::start(ConfigStore::in_memory(), &wiki, &openrouter);
    harness.select_and_click("zzzxqj", Point::new(300.0, 300.0), "wiki");

    assert_eq!(
        harness.surface.next_result().await,
        Shown::Notification("No Wikipedia results found".into())
    );
    harness.stop().await;
}

#[tokio::test]
async fn search_outage_shows_failure_notification() {
    let wiki = MockServer::start().await;
    let openrouter = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&wiki)
        .await;

    let harness = Harness::start(ConfigStore::in_memory(), &wiki, &openrouter);
    harness.select_and_click("octopus", Point::new(300.0, 300.0), "wiki");

    assert_eq!(
        harness.surface.next_result().await,
        Shown::Notification("Wikipedia search failed".into())
    );
    harness.stop().await;
}
