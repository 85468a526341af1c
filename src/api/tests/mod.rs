use super::*;
use crate::runner::test_helpers::{wait_for_terminal, zip_bytes};
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};


const WAIT: Duration = Duration::from_secs(10);

/// Helper to create a test DocumentExtractor instance wrapped in Arc
async fn create_test_extractor() -> (Arc<DocumentExtractor>, tempfile::TempDir) {
    let (extractor, temp_dir) = crate::runner::test_helpers::create_test_extractor().await;
    (Arc::new(extractor), temp_dir)
}

/// Router over the extractor's own config
fn app_for(extractor: &Arc<DocumentExtractor>) -> Router {
    create_router(extractor.clone(), extractor.config().clone())
}

/// Send one request and collect status, headers and body
async fn send(app: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, body)
}

async fn get(app: Router, uri: &str) -> (StatusCode, HeaderMap, Bytes) {
    send(
        app,
        Request::builder().uri(uri).body(Body::empty()).unwrap(),
    )
    .await
}

async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let (status, _, bytes) = send(
        app,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Serve a ZIP archive at `/docs.zip` and return its URL
async fn serve_docs(server: &MockServer, files: &[(&str, &[u8])]) -> String {
    Mock::given(method("GET"))
        .and(path("/docs.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(zip_bytes(files)))
        .mount(server)
        .await;
    format!("{}/docs.zip", server.uri())
}

/// Create a task through the API and wait for it to finish
async fn create_and_finish(
    extractor: &Arc<DocumentExtractor>,
    url: &str,
    mode: &str,
) -> crate::types::Task {
    let (status, body) = post_json(
        app_for(extractor),
        "/extract",
        serde_json::json!({ "url": url, "mode": mode }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let id: crate::types::TaskId = body["task_id"].as_str().unwrap().parse().unwrap();
    wait_for_terminal(extractor, id, WAIT).await
}

#[tokio::test]
async fn test_api_server_spawns() {
    let (extractor, _temp_dir) = create_test_extractor().await;

    // Port 0 = OS assigns a free port
    let mut config = (**extractor.config()).clone();
    config.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let config = Arc::new(config);

    let api_handle = tokio::spawn({
        let extractor = extractor.clone();
        let config = config.clone();
        async move { start_api_server(extractor, config).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!api_handle.is_finished(), "server exited early");
    api_handle.abort();
}

#[tokio::test]
async fn test_cors_enabled() {
    let (extractor, _temp_dir) = create_test_extractor().await;

    let mut config = (**extractor.config()).clone();
    config.api.cors_enabled = true;
    config.api.cors_origins = vec!["*".to_string()];
    let app = create_router(extractor, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(
        headers.contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_specific_origin() {
    let (extractor, _temp_dir) = create_test_extractor().await;

    let mut config = (**extractor.config()).clone();
    config.api.cors_origins = vec!["http://ui.local:3000".to_string()];
    let app = create_router(extractor, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://ui.local:3000")
        .body(Body::empty())
        .unwrap();
    let (_, headers, _) = send(app, request).await;

    assert_eq!(
        headers.get("access-control-allow-origin").unwrap(),
        "http://ui.local:3000"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let (extractor, _temp_dir) = create_test_extractor().await;

    let mut config = (**extractor.config()).clone();
    config.api.cors_enabled = false;
    let app = create_router(extractor, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(!headers.contains_key("access-control-allow-origin"));
}
