//! Cross-cutting behavior of the request pipeline.

mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
    routing::get,
};
use serde_json::Value;
use tower::ServiceExt;

use musicgate_service::{apply_pipeline, build_app};
use musicgate_service_shared::{
    RateLimiter, is_envelope,
    test_utils::{LogCapture, TEST_DOCS_URL, test_state},
};

use common::{envelope, server, server_with, test_config};

#[tokio::test]
async fn home_lists_routes() {
    let response = server().get("/").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body = envelope(response.json::<Value>());
    assert_eq!(body["status"], "Success");
    assert_eq!(body["data"]["docsUrl"], TEST_DOCS_URL);
    assert!(
        body["data"]["routes"]
            .as_array()
            .is_some_and(|routes| routes.iter().any(|r| r == "/search/ytmusic?q="))
    );
}

#[tokio::test]
async fn ping_with_and_without_trailing_slash() {
    let server = server();

    for path in ["/ping", "/ping/"] {
        let response = server.get(path).await;
        assert_eq!(response.status_code(), StatusCode::OK, "{path}");

        let body = envelope(response.json::<Value>());
        assert_eq!(body["message"], "pong");
        assert_eq!(body["data"]["service"], "musicgate");
        assert!(body["data"]["timestamp"].is_string());
    }
}

#[tokio::test]
async fn unmatched_route_names_docs_url() {
    let response = server().get("/does/not/exist").await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body = envelope(response.json::<Value>());
    assert_eq!(body["status"], "Failed");
    assert_eq!(
        body["message"],
        format!("Requested route not found, please check the documentation at {TEST_DOCS_URL}")
    );
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn wrong_method_still_gets_an_envelope() {
    let response = server().post("/ping").await;

    assert_eq!(response.status_code(), StatusCode::METHOD_NOT_ALLOWED);
    let body = envelope(response.json::<Value>());
    assert_eq!(body["status"], "Failed");
    assert_eq!(body["message"], "Method Not Allowed");
}

#[tokio::test]
async fn every_pipeline_response_is_an_envelope() {
    let server = server();
    let paths = [
        "/",
        "/ping",
        "/search/ytmusic",
        "/search/ytmusic?q=kabira",
        "/get/yt-stream",
        "/get/yt-stream?id=dQw4w9WgXcQ",
        "/song?id=abc",
        "/nowhere",
    ];

    for path in paths {
        let body = server.get(path).await.json::<Value>();
        assert!(is_envelope(&body), "{path} returned {body}");
    }
}

#[tokio::test]
async fn pretty_query_indents_output() {
    let server = server();

    let compact = server.get("/").await.text();
    let pretty = server
        .get("/")
        .add_query_param("pretty", "true")
        .await
        .text();

    assert!(!compact.contains('\n'));
    assert!(pretty.contains("\n  \""));
    assert_eq!(
        serde_json::from_str::<Value>(&compact).unwrap()["data"]["routes"],
        serde_json::from_str::<Value>(&pretty).unwrap()["data"]["routes"]
    );
}

#[tokio::test]
async fn request_id_is_echoed() {
    let response = server()
        .get("/ping")
        .add_header(
            header::HeaderName::from_static("x-request-id"),
            header::HeaderValue::from_static("trace-me"),
        )
        .await;

    assert_eq!(response.headers()["x-request-id"], "trace-me");
}

async fn boom() -> &'static str {
    panic!("kaboom")
}

#[tokio::test]
async fn panics_reach_the_error_boundary() {
    let config = test_config();
    let app = apply_pipeline(
        Router::new().route("/boom", get(boom)),
        &config,
        RateLimiter::in_memory(&config.rate_limit),
    );

    let response = app
        .oneshot(Request::builder().uri("/boom").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = envelope(serde_json::from_slice(&bytes).unwrap());
    assert_eq!(body["message"], "❌ kaboom");
}

#[tokio::test]
async fn malformed_query_is_unclassified() {
    let (logs, _guard) = LogCapture::install();
    let app = build_app(test_state(), &test_config());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/search/ytmusic?q=a&q=b")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = envelope(serde_json::from_slice(&bytes).unwrap());
    assert!(body["message"].as_str().unwrap().starts_with("❌ "));
    assert!(logs.contents().contains("error boundary"));
}

fn preflight(origin: &str) -> Request<Body> {
    Request::builder()
        .method(Method::OPTIONS)
        .uri("/ping")
        .header(header::ORIGIN, origin)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn cors_is_permissive_by_default() {
    let app = build_app(test_state(), &test_config());

    let response = app.oneshot(preflight("https://player.example")).await.unwrap();

    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn cors_allowlist_rejects_other_origins() {
    let mut config = test_config();
    config.cors.allowed_origins = vec!["https://player.example".to_string()];

    let allowed = build_app(test_state(), &config)
        .oneshot(preflight("https://player.example"))
        .await
        .unwrap();
    assert_eq!(
        allowed.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://player.example"
    );

    let denied = build_app(test_state(), &config)
        .oneshot(preflight("https://evil.example"))
        .await
        .unwrap();
    assert!(
        !denied
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
    );
}

#[tokio::test]
async fn metrics_endpoint_serves_text_outside_the_envelope() {
    let mut config = test_config();
    config.metrics.enabled = true;

    let response = server_with(test_state(), &config).get("/metrics").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.text().contains('#'));
    assert!(serde_json::from_str::<Value>(&response.text()).is_err());
}
