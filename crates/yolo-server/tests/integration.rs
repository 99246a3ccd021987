use axum::http::StatusCode;
use http_body_util::BodyExt;
use std::path::Path;
use tempfile::TempDir;
use tower::ServiceExt;
use yolo_core::store::WorkItemStore;
use yolo_server::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn write_item(root: &Path, id: &str, body: &str) {
    WorkItemStore::new(root)
        .write(&id.parse().unwrap(), body)
        .unwrap();
}

/// Two epics that depend on each other.
fn linked_epics(dir: &TempDir) {
    write_item(
        dir.path(),
        "E001",
        "# [E001] Core\n\n## Status\n  - Current Status: in-progress\n\n## Dependencies\n- [E002] Billing\n",
    );
    write_item(
        dir.path(),
        "E002",
        "# [E002] Billing\n\n## Dependencies\n- E001\n",
    );
}

fn app(dir: &TempDir, static_dir: Option<&Path>) -> axum::Router {
    let state = AppState::load(dir.path(), static_dir.map(Path::to_path_buf)).unwrap();
    yolo_server::build_router(state)
}

/// Send a GET request via `oneshot` and return (status, parsed JSON body).
async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

/// GET returning (status, content-type, raw body).
async fn get_raw(app: axum::Router, uri: &str) -> (StatusCode, String, String) {
    let req = axum::http::Request::builder()
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(axum::http::header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string())
        .unwrap_or_default();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, content_type, String::from_utf8_lossy(&body).into_owned())
}

// ---------------------------------------------------------------------------
// API
// ---------------------------------------------------------------------------

#[tokio::test]
async fn links_between_two_epics() {
    let dir = TempDir::new().unwrap();
    linked_epics(&dir);

    let (status, json) = get(app(&dir, None), "/api/links").await;
    assert_eq!(status, StatusCode::OK);
    let mut links: Vec<(String, String)> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|l| {
            (
                l["source"].as_str().unwrap().to_string(),
                l["target"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    links.sort();
    assert_eq!(
        links,
        [
            ("epic-1".to_string(), "epic-2".to_string()),
            ("epic-2".to_string(), "epic-1".to_string()),
        ]
    );
}

#[tokio::test]
async fn nodes_carry_item_fields() {
    let dir = TempDir::new().unwrap();
    linked_epics(&dir);

    let (status, json) = get(app(&dir, None), "/api/nodes").await;
    assert_eq!(status, StatusCode::OK);
    let nodes = json.as_array().unwrap();
    assert_eq!(nodes.len(), 2);
    let core = nodes.iter().find(|n| n["id"] == "epic-1").unwrap();
    assert_eq!(core["type"], "epic");
    assert_eq!(core["title"], "Core");
    assert_eq!(core["status"], "in-progress");
    assert_eq!(core["version"], "0.1.0");
    assert_eq!(core["links"], serde_json::json!(["epic-2"]));
    assert!(core["content"].as_str().unwrap().starts_with("# [E001] Core"));
    assert!(core["modified"].is_string());
}

#[tokio::test]
async fn single_node_by_either_id() {
    let dir = TempDir::new().unwrap();
    linked_epics(&dir);

    let (status, json) = get(app(&dir, None), "/api/node/epic-2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "Billing");

    let (status, json) = get(app(&dir, None), "/api/node/E002").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], "epic-2");
}

#[tokio::test]
async fn missing_node_is_404() {
    let dir = TempDir::new().unwrap();
    linked_epics(&dir);

    let (status, json) = get(app(&dir, None), "/api/node/epic-9").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("epic-9"));
}

#[tokio::test]
async fn empty_project_has_no_nodes() {
    let dir = TempDir::new().unwrap();
    let (status, json) = get(app(&dir, None), "/api/nodes").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!([]));
}

// ---------------------------------------------------------------------------
// Static files
// ---------------------------------------------------------------------------

#[tokio::test]
async fn static_files_use_explicit_types_and_fall_back_to_index() {
    let dir = TempDir::new().unwrap();
    let web = dir.path().join("yolo/web");
    std::fs::create_dir_all(web.join("js")).unwrap();
    std::fs::write(web.join("index.html"), "<html>graph</html>").unwrap();
    std::fs::write(web.join("js/app.js"), "console.log(1)").unwrap();
    std::fs::write(web.join("style.css"), "body{}").unwrap();

    let (status, ct, body) = get_raw(app(&dir, None), "/js/app.js").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ct, "application/javascript");
    assert_eq!(body, "console.log(1)");

    let (_, ct, _) = get_raw(app(&dir, None), "/style.css").await;
    assert_eq!(ct, "text/css");

    let (status, ct, body) = get_raw(app(&dir, None), "/some/view").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ct, "text/html");
    assert_eq!(body, "<html>graph</html>");
}

#[tokio::test]
async fn no_static_dir_is_404() {
    let dir = TempDir::new().unwrap();
    let (status, json) = get(app(&dir, None), "/index.html").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].is_string());
}
