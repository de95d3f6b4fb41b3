//! Integration tests for the relay API.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use dhru_client::DhruClient;
use order_store::{DeviceKind, OrderRecord, OrderStore};
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;
use unlock_relay::api::{
    create_router_with_rate_limit, AppState, RateLimitState, RelayOptions,
};
use wiremock::matchers::{any, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// App state pointed at a URL nothing listens on; good for tests that never
/// reach the provider.
fn offline_state(relay: RelayOptions) -> AppState {
    let client = DhruClient::new(
        "http://localhost:9",
        "alice",
        "test-key",
        Duration::from_secs(1),
    )
    .unwrap();
    AppState::new(client, OrderStore::memory(), relay)
}

fn mock_state(mock_server: &MockServer, relay: RelayOptions) -> AppState {
    let client = DhruClient::new(
        mock_server.uri(),
        "alice",
        "test-key",
        Duration::from_secs(5),
    )
    .unwrap();
    AppState::new(client, OrderStore::memory(), relay)
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

async fn post_json(app: axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap();
    (status, json)
}

#[tokio::test]
async fn health_reports_discovery_and_order_state() {
    let state = offline_state(RelayOptions::default());
    let app = create_router_with_rate_limit(state, RateLimitState::permissive());

    let (status, json) = get(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["endpoint_discovered"], false);
    assert_eq!(json["field_map_discovered"], false);
    assert_eq!(json["orders_recorded"], 0);
}

#[tokio::test]
async fn order_log_starts_empty() {
    let state = offline_state(RelayOptions::default());
    let app = create_router_with_rate_limit(state, RateLimitState::permissive());

    let (status, json) = get(app, "/v1/orders").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 0);
    assert!(json["orders"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn service_details_rejects_short_ids() {
    let state = offline_state(RelayOptions::default());
    let app = create_router_with_rate_limit(state, RateLimitState::permissive());

    let (status, json) = get(app, "/v1/services/ab").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_SERVICE_ID");
}

#[tokio::test]
async fn place_order_rejects_bad_luhn_imei() {
    let state = offline_state(RelayOptions::default());
    let app = create_router_with_rate_limit(state, RateLimitState::permissive());

    let (status, json) = post_json(
        app,
        "/v1/orders",
        json!({"service_id": "1001", "imei": "490154203237517"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_DEVICE");
    assert!(json["error"].as_str().unwrap().contains("Luhn"));
}

#[tokio::test]
async fn place_order_requires_a_service_id() {
    let state = offline_state(RelayOptions::default());
    let app = create_router_with_rate_limit(state, RateLimitState::permissive());

    let (status, json) = post_json(app, "/v1/orders", json!({"imei": "490154203237518"})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_SERVICE_ID");
}

#[tokio::test]
async fn order_status_serves_the_local_log_when_disabled() {
    let state = offline_state(RelayOptions {
        order_status_enabled: false,
        ..RelayOptions::default()
    });

    state
        .store
        .add_order(OrderRecord::new(
            Some("991".into()),
            "1001".into(),
            DeviceKind::Imei,
            "490154203237518".into(),
            Some("submitted".into()),
            json!({"orderid": 991}),
        ))
        .await
        .unwrap();

    let app = create_router_with_rate_limit(state.clone(), RateLimitState::permissive());
    let (status, json) = get(app, "/v1/orders/991").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["stub"], true);
    assert_eq!(json["order"]["id"], "991");

    let app = create_router_with_rate_limit(state, RateLimitState::permissive());
    let (status, json) = get(app, "/v1/orders/unknown-id").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "ORDER_NOT_FOUND");
}

#[tokio::test]
async fn rate_limiting_returns_429() {
    let state = offline_state(RelayOptions::default());
    let rate_limit = RateLimitState::new(1);
    let app = create_router_with_rate_limit(state, rate_limit);

    let (status, _) = get(app.clone(), "/health").await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = get(app, "/health").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["code"], "RATE_LIMIT_EXCEEDED");
}

#[tokio::test]
async fn unreachable_provider_maps_to_bad_gateway() {
    let state = offline_state(RelayOptions::default());
    let app = create_router_with_rate_limit(state, RateLimitState::permissive());

    let (status, json) = get(app, "/v1/balance").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["code"], "PROVIDER_ERROR");
}

#[tokio::test]
async fn services_are_normalized_priced_and_cached() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/index.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "services": [
                {"ServiceID": 101, "servicename": "iPhone Unlock", "Credit": 10.0},
                {"service_id": "102", "name": "Samsung Unlock", "price": "call us"}
            ]
        })))
        .mount(&mock_server)
        .await;

    let state = mock_state(
        &mock_server,
        RelayOptions {
            profit_margin_percent: 15.0,
            ..RelayOptions::default()
        },
    );
    let app = create_router_with_rate_limit(state.clone(), RateLimitState::permissive());

    let (status, json) = get(app, "/v1/services").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cached"], false);
    let services = json["services"].as_array().unwrap();
    assert_eq!(services.len(), 2);
    assert_eq!(services[0]["service_id"], 101);
    assert_eq!(services[0]["name"], "iPhone Unlock");
    // 10.0 marked up by 15%
    assert_eq!(services[0]["price"], 11.5);
    // String prices pass through untouched
    assert_eq!(services[1]["price"], "call us");

    // Second request must come from the cache
    let app = create_router_with_rate_limit(state, RateLimitState::permissive());
    let (status, json) = get(app, "/v1/services").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cached"], true);
}

#[tokio::test]
async fn block_list_hides_services() {
    let mock_server = MockServer::start().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "services": [
                {"serviceid": "101", "servicename": "Keep"},
                {"serviceid": "102", "servicename": "Hide"}
            ]
        })))
        .mount(&mock_server)
        .await;

    let state = mock_state(
        &mock_server,
        RelayOptions {
            block_list: vec!["102".to_string()],
            ..RelayOptions::default()
        },
    );
    let app = create_router_with_rate_limit(state, RateLimitState::permissive());

    let (_, json) = get(app, "/v1/services").await;
    let services = json["services"].as_array().unwrap();
    assert_eq!(services.len(), 1);
    assert_eq!(services[0]["service_id"], "101");
}

#[tokio::test]
async fn balance_is_extracted_and_previews_are_redacted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/index.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Balance": "42.50",
            "Currency": "USD",
            "echo_user": "alice"
        })))
        .mount(&mock_server)
        .await;

    let state = mock_state(&mock_server, RelayOptions::default());
    let app = create_router_with_rate_limit(state, RateLimitState::permissive());

    let (status, json) = get(app, "/v1/balance").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ok"], true);
    assert_eq!(json["balance"], "42.50");
    assert_eq!(json["currency"], "USD");
    // The configured username must never appear in a preview
    let preview = json["raw_preview"].as_str().unwrap();
    assert!(!preview.contains("alice"));
}

#[tokio::test]
async fn placed_orders_are_recorded_in_the_log() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/index.php"))
        .and(body_string_contains("action=placeorder"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "orderid": 991,
            "status": "processing"
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/index.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&mock_server)
        .await;

    let state = mock_state(&mock_server, RelayOptions::default());
    let app = create_router_with_rate_limit(state.clone(), RateLimitState::permissive());

    let (status, json) = post_json(
        app,
        "/v1/orders",
        json!({"service_id": "1001", "imei": "490154203237518"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ok"], true);
    assert_eq!(json["order"]["id"], "991");
    assert_eq!(json["order"]["status"], "processing");
    assert_eq!(json["order"]["device_kind"], "imei");

    let app = create_router_with_rate_limit(state, RateLimitState::permissive());
    let (_, json) = get(app, "/v1/orders").await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["orders"][0]["id"], "991");
}

#[tokio::test]
async fn provider_probe_reports_results_and_discovery() {
    let mock_server = MockServer::start().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&mock_server)
        .await;

    let state = mock_state(&mock_server, RelayOptions::default());
    let app = create_router_with_rate_limit(state, RateLimitState::permissive());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/provider/probe")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        "no-store"
    );

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["results"].as_array().unwrap().len(), 6);
}
