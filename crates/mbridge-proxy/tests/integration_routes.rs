//! Integration tests for status and pass-through routing.

mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{
    ChannelStore, UNREACHABLE_UPSTREAM, as_json, assert_no_row, router, send, test_config,
};

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn status_reports_online_with_upstream_health() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .expect(2)
        .mount(&server)
        .await;

    for uri in ["/", "/status"] {
        let app = router(test_config(&server.uri()), None);
        let (status, body) = send(app, get(uri)).await;

        assert_eq!(status, StatusCode::OK, "{uri}");
        let body = as_json(&body);
        assert_eq!(body["status"], "online");
        assert_eq!(body["service"], "Mistral API Bridge");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(body["mistral"], json!({"status": "ok"}));
        assert!(body["timestamp"].is_string());
    }
}

#[tokio::test]
async fn status_wraps_plain_text_health() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&server)
        .await;

    let app = router(test_config(&server.uri()), None);
    let (status, body) = send(app, get("/status")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_json(&body)["mistral"], "OK");
}

#[tokio::test]
async fn status_reports_error_when_upstream_down() {
    let app = router(test_config(UNREACHABLE_UPSTREAM), None);
    let (status, body) = send(app, get("/status")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = as_json(&body);
    assert_eq!(body["status"], "error");
    assert!(!body["error"].as_str().unwrap().is_empty());
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn status_reports_error_on_unhealthy_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503).set_body_string("loading model"))
        .mount(&server)
        .await;

    let app = router(test_config(&server.uri()), None);
    let (status, body) = send(app, get("/status")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(as_json(&body)["status"], "error");
}

#[tokio::test]
async fn status_probe_is_bounded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let config = test_config(&server.uri()).with_health_timeout(Duration::from_millis(200));
    let app = router(config, None);
    let (status, body) = send(app, get("/status")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(as_json(&body)["status"], "error");
}

#[tokio::test]
async fn passthrough_relays_get_with_query_and_auth() {
    let server = MockServer::start().await;
    let models = json!({"object": "list", "data": [{"id": "mistral-7b"}]});
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .and(query_param("limit", "5"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(models.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let (store, mut rx) = ChannelStore::new();
    let app = router(test_config(&server.uri()), Some(store));
    let request = Request::builder()
        .uri("/v1/models?limit=5")
        .header("authorization", "Bearer abc")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_json(&body), models);
    assert_no_row(&mut rx).await;

    let received = server.received_requests().await.unwrap();
    assert!(received[0].body.is_empty());
}

#[tokio::test]
async fn passthrough_forwards_post_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;

    let app = router(test_config(&server.uri()), None);
    let request = Request::builder()
        .method("POST")
        .uri("/v1/embeddings")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"input":"abc"}"#))
        .unwrap();

    let (status, _) = send(app, request).await;
    assert_eq!(status, StatusCode::CREATED);

    let received = server.received_requests().await.unwrap();
    assert_eq!(received[0].body, br#"{"input":"abc"}"#);
}

#[tokio::test]
async fn get_on_chat_path_uses_passthrough() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(405).set_body_json(json!({"detail": "Method Not Allowed"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (store, mut rx) = ChannelStore::new();
    let app = router(test_config(&server.uri()), Some(store));
    let (status, body) = send(app, get("/v1/chat/completions")).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(as_json(&body)["detail"], "Method Not Allowed");
    assert_no_row(&mut rx).await;
}

#[tokio::test]
async fn passthrough_unreachable_returns_bridge_error() {
    let app = router(test_config(UNREACHABLE_UPSTREAM), None);
    let (status, body) = send(app, get("/v1/models")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(as_json(&body)["error"]["code"], "upstream_unreachable");
}

#[tokio::test]
async fn paths_outside_v1_are_not_proxied() {
    let server = MockServer::start().await;
    let app = router(test_config(&server.uri()), None);

    let (status, _) = send(app, get("/admin")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let server = MockServer::start().await;
    let mut config = test_config(&server.uri());
    config.body_limit_bytes = 16;
    let app = router(config, None);

    let request = Request::builder()
        .method("POST")
        .uri("/v1/chat/completions")
        .header("content-type", "application/json")
        .body(Body::from(vec![b'a'; 64]))
        .unwrap();
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    let body = as_json(&body);
    assert_eq!(body["error"]["type"], "bridge_error");
    assert_eq!(body["error"]["code"], "payload_too_large");
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn oversized_passthrough_body_is_rejected_as_json() {
    let server = MockServer::start().await;
    let mut config = test_config(&server.uri());
    config.body_limit_bytes = 16;
    let app = router(config, None);

    let request = Request::builder()
        .method("POST")
        .uri("/v1/embeddings")
        .header("content-type", "application/json")
        .body(Body::from(vec![b'a'; 64]))
        .unwrap();
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(as_json(&body)["error"]["code"], "payload_too_large");
    assert!(server.received_requests().await.unwrap().is_empty());
}
