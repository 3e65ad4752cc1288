use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use courier_server::{app, bus::QueueBus, channel::HttpChannel, config::AgentConfig, AppState};
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt; // for oneshot

fn workspace_app(workspace: Option<PathBuf>) -> axum::Router {
    let (bus, _inbound_rx) = QueueBus::channel();
    app(AppState {
        channel: Arc::new(HttpChannel::new(Arc::new(bus))),
        workspace,
        agent: AgentConfig::default(),
        max_body_bytes: 1024 * 1024,
    })
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn assert_cors(response: &axum::response::Response) {
    let headers = response.headers();
    assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
    assert_eq!(
        headers.get("access-control-allow-methods").unwrap(),
        "GET, POST, DELETE, OPTIONS"
    );
    assert_eq!(
        headers.get("access-control-allow-headers").unwrap(),
        "Content-Type, X-User-ID"
    );
}

#[tokio::test]
async fn health_reports_channel() {
    let response = workspace_app(None).oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_cors(&response);
    assert_eq!(
        json_body(response).await,
        json!({ "status": "ok", "channel": "http" })
    );
}

#[tokio::test]
async fn memory_returns_both_documents() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("memory")).unwrap();
    fs::write(dir.path().join("memory/MEMORY.md"), "likes tea").unwrap();

    let response = workspace_app(Some(dir.path().to_path_buf()))
        .oneshot(get("/memory"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({ "memory": "likes tea", "history": "" })
    );
}

#[tokio::test]
async fn memory_with_invalid_utf8_is_still_served() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("memory")).unwrap();
    fs::write(dir.path().join("memory/MEMORY.md"), b"\xff\xfe bytes").unwrap();

    let response = workspace_app(Some(dir.path().to_path_buf()))
        .oneshot(get("/memory"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["memory"].as_str().unwrap().ends_with(" bytes"));
}

#[tokio::test]
async fn memory_without_workspace_is_empty() {
    let response = workspace_app(None).oneshot(get("/memory")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({ "memory": "", "history": "" })
    );
}

#[tokio::test]
async fn files_are_sorted_and_skip_internal_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("files_uploaded")).unwrap();
    fs::create_dir_all(root.join("memory")).unwrap();
    fs::create_dir_all(root.join("skills/__pycache__")).unwrap();
    fs::create_dir_all(root.join(".courier-staging")).unwrap();
    fs::write(root.join("files_uploaded/b.txt"), "b").unwrap();
    fs::write(root.join("memory/MEMORY.md"), "m").unwrap();
    fs::write(root.join("AGENTS.md"), "a").unwrap();
    fs::write(root.join("skills/__pycache__/x.pyc"), "c").unwrap();
    fs::write(root.join(".courier-staging/upload-tmp"), "t").unwrap();

    let response = workspace_app(Some(root.to_path_buf()))
        .oneshot(get("/files"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({ "files": ["AGENTS.md", "files_uploaded/b.txt", "memory/MEMORY.md"] })
    );
}

#[tokio::test]
async fn files_without_workspace_is_empty() {
    let response = workspace_app(None).oneshot(get("/files")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "files": [] }));
}

#[tokio::test]
async fn preflight_on_any_path_is_204() {
    for path in ["/chat", "/uploads", "/does/not/exist"] {
        let response = workspace_app(None)
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri(path)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT, "path: {path}");
        assert_cors(&response);
    }
}

#[tokio::test]
async fn unknown_route_is_json_404_with_cors() {
    let response = workspace_app(None)
        .oneshot(get("/nowhere"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_cors(&response);
    assert!(json_body(response).await["error"].is_string());
}

#[tokio::test]
async fn wrong_method_is_json_405_with_cors() {
    for (method, path) in [("GET", "/chat"), ("POST", "/files"), ("GET", "/conversations")] {
        let response = workspace_app(None)
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(path)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.status(),
            StatusCode::METHOD_NOT_ALLOWED,
            "{method} {path}"
        );
        assert_cors(&response);
        assert_eq!(json_body(response).await["error"], "method not allowed");
    }
}

#[tokio::test]
async fn error_responses_carry_cors() {
    let response = workspace_app(None)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/uploads")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_cors(&response);
}
