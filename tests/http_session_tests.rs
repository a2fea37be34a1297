// End-to-end tests over HTTP
//
// Tests cover:
// - Both backend response shapes decoded through a real session
// - Server errors surfaced as user-facing error text
// - Preferences persisted to disk and restored by a new session

use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tire_search::gateway::{HttpSearchGateway, SearchGateway};
use tire_search::services::{SearchSession, SessionOptions};
use tire_search::storage::{JsonFileStore, MemoryStore, PersistenceStore, StorageKey};

fn gateway(server: &MockServer) -> Arc<dyn SearchGateway> {
    Arc::new(HttpSearchGateway::with_client(
        reqwest::Client::new(),
        &server.uri(),
    ))
}

fn temp_dir() -> PathBuf {
    std::env::temp_dir().join(format!("tire-search-it-{}", uuid::Uuid::new_v4()))
}

#[tokio::test]
async fn test_legacy_response_through_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tire_search"))
        .and(body_partial_json(json!({
            "query": "BMW 3 Series 2020",
            "offset": 0,
            "limit": 20,
            "use_llm": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"id": 11, "brand_name": "BMW", "model_name": "3 Series", "year_from": 2019, "year_to": 2022,
                 "tire_sizes": [{"width": 225, "height": 45, "diameter": 18}]},
                {"id": 12, "brand_name": "BMW", "model_name": "3 Series Touring", "year_from": 2019, "year_to": 2022,
                 "tire_sizes": [{"width": 225, "height": 50, "diameter": 17}]}
            ],
            "total": 2,
            "pagination": {"offset": 0, "limit": 20, "has_more": false}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/tire_search/history"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let session = SearchSession::new(
        gateway(&server),
        Arc::new(MemoryStore::new()),
        SessionOptions::default(),
    );
    let response = session.search("BMW 3 Series 2020", None).await.unwrap();
    assert_eq!(response.items.len(), 2);

    let state = session.snapshot();
    assert_eq!(state.results.len(), 2);
    assert!(!state.has_more);
    assert_eq!(state.history, vec!["BMW 3 Series 2020"]);
    assert_eq!(state.results[0].tire_sizes[0].to_string(), "225/45 R18");
}

#[tokio::test]
async fn test_flat_vehicle_response_through_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tire_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "car_info": {"brand": "Lada", "model": "Vesta", "year": 2020},
            "tire_sizes": [
                {"width": 185, "profile": 65, "diameter": 15},
                {"width": 195, "profile": 55, "diameter": 16, "type": "optional"}
            ],
            "suggestions": ["Lada Vesta SW"]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/tire_search/history"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let session = SearchSession::new(
        gateway(&server),
        Arc::new(MemoryStore::new()),
        SessionOptions::default(),
    );
    session.search("лада веста", None).await.unwrap();

    let state = session.snapshot();
    assert_eq!(state.results.len(), 1);
    assert_eq!(state.total, 1);
    assert_eq!(state.results[0].title(), "Lada Vesta (2020)");
    assert_eq!(state.results[0].tire_sizes.len(), 2);
    assert_eq!(state.hints, vec!["Lada Vesta SW"]);
}

#[tokio::test]
async fn test_server_error_becomes_state_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tire_search"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"detail": "database unavailable"})),
        )
        .mount(&server)
        .await;

    let session = SearchSession::new(
        gateway(&server),
        Arc::new(MemoryStore::new()),
        SessionOptions::default(),
    );
    assert!(session.search("kia rio", None).await.is_none());

    let state = session.snapshot();
    let error = state.error.unwrap();
    assert!(error.contains("HTTP 500"));
    assert!(error.contains("database unavailable"));
    assert!(state.results.is_empty());
    assert!(!state.loading);
}

#[tokio::test]
async fn test_preferences_survive_new_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tire_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": [], "total": 0})))
        .mount(&server)
        .await;

    let dir = temp_dir();
    let store: Arc<dyn PersistenceStore> = Arc::new(JsonFileStore::new(&dir).unwrap());

    let first = SearchSession::new(gateway(&server), store.clone(), SessionOptions::default());
    first.search("Kia Rio", None).await;
    first.search("Skoda Octavia", None).await;
    first.toggle_favorite(101);
    first
        .search_with_filters(tire_search::models::SearchFilters {
            diameter: Some(16),
            ..Default::default()
        })
        .await;

    let reopened: Arc<dyn PersistenceStore> = Arc::new(JsonFileStore::new(&dir).unwrap());
    assert!(reopened.load(StorageKey::Favorites).unwrap().is_some());

    let second = SearchSession::new(gateway(&server), reopened, SessionOptions::default());
    let state = second.snapshot();
    assert_eq!(state.history, vec!["Skoda Octavia", "Kia Rio"]);
    assert!(second.is_favorite(101));
    assert_eq!(second.recent_filters().diameter, Some(16));

    second.clear_history();
    assert!(store.load(StorageKey::SearchHistory).unwrap().is_none());

    std::fs::remove_dir_all(&dir).ok();
}
