//! Route tests for the dev file server.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use pristine_devserver::routes::{self, files::FileRoot};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// Layout:
/// ```text
/// project/
///   demo/        (served)
///   frontend/
///   notes.txt
/// ```
fn fixture() -> (TempDir, Router) {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().join("project");
    let demo = project.join("demo");
    let frontend = project.join("frontend");
    fs::create_dir_all(&demo).unwrap();
    fs::create_dir_all(frontend.join("assets")).unwrap();

    fs::write(demo.join("index.html"), "<h1>home</h1>").unwrap();
    fs::write(demo.join("test.html"), "<h1>test</h1>").unwrap();
    fs::write(demo.join("site.css"), "body {}").unwrap();
    fs::write(frontend.join("widget.js"), "console.log('hi')").unwrap();
    fs::write(project.join("notes.txt"), "inside the project").unwrap();
    fs::write(dir.path().join("secret.txt"), "outside the project").unwrap();

    let root = FileRoot::new(&demo).unwrap();
    (dir, routes::router(Arc::new(root)))
}

async fn request(app: &Router, method: Method, uri: &str) -> (StatusCode, Option<String>, String) {
    let response = app
        .clone()
        .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, content_type, String::from_utf8_lossy(&body).into_owned())
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Option<String>, String) {
    request(app, Method::GET, uri).await
}

#[tokio::test]
async fn test_root_serves_index() {
    let (_dir, app) = fixture();
    let (status, content_type, body) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/html"));
    assert_eq!(body, "<h1>home</h1>");
}

#[tokio::test]
async fn test_clean_urls_append_html() {
    let (_dir, app) = fixture();
    let (status, _, body) = get(&app, "/test").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "<h1>test</h1>");
}

#[tokio::test]
async fn test_query_string_is_ignored() {
    let (_dir, app) = fixture();
    let (status, content_type, _) = get(&app, "/site.css?v=3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/css"));
}

#[tokio::test]
async fn test_frontend_maps_to_sibling_directory() {
    let (_dir, app) = fixture();
    let (status, content_type, body) = get(&app, "/frontend/widget.js").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/javascript"));
    assert_eq!(body, "console.log('hi')");
}

#[tokio::test]
async fn test_project_root_files_are_reachable() {
    let (_dir, app) = fixture();
    let (status, content_type, body) = get(&app, "/../notes.txt").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/octet-stream"));
    assert_eq!(body, "inside the project");
}

#[tokio::test]
async fn test_traversal_is_forbidden() {
    let (_dir, app) = fixture();
    for uri in ["/../../etc/passwd", "/../../secret.txt", "/frontend/../../secret.txt"] {
        let (status, _, body) = get(&app, uri).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
        assert!(!body.contains("outside the project"));
    }
}

#[tokio::test]
async fn test_missing_file_is_404() {
    let (_dir, app) = fixture();
    let (status, _, body) = get(&app, "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("/nope"));
}

#[tokio::test]
async fn test_directory_read_is_500() {
    let (_dir, app) = fixture();
    let (status, _, _) = get(&app, "/frontend/assets").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_only_get_is_allowed() {
    let (_dir, app) = fixture();
    for method in [Method::POST, Method::PUT, Method::DELETE] {
        let (status, _, _) = request(&app, method, "/").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }
}
