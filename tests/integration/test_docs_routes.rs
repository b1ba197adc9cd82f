//! Integration tests for the rendered documentation endpoints.

#[path = "../common/mod.rs"]
mod common;

use axum::http::StatusCode;
use common::test_server;
use drafts_api::config::DEFAULT_API_SERVER_URL;
use serde_json::Value;

#[tokio::test]
async fn test_list_pages() {
    let (server, _) = test_server().await;

    let response = server.get("/api/v1/docs").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["result"], "success");
    let slugs: Vec<&str> = body["pages"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|page| page["slug"].as_str())
        .collect();
    assert_eq!(
        slugs,
        vec!["get-drafts", "create-drafts", "edit-draft", "delete-draft"]
    );
    assert_eq!(body["pages"][0]["title"], "Get drafts");
}

#[tokio::test]
async fn test_get_page_renders_markdown() {
    let (server, _) = test_server().await;

    let response = server.get("/api/v1/docs/create-drafts").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let content_type = response.header("content-type");
    assert!(content_type.to_str().unwrap().starts_with("text/markdown"));

    let page = response.text();
    assert!(page.starts_with("# Create drafts"));
    assert!(!page.contains("{generate_"), "unexpanded macro in:\n{}", page);
    assert!(!page.contains("{start_tabs}"));
    assert!(page.contains(&format!("curl -sSX POST {}/drafts", DEFAULT_API_SERVER_URL)));
    assert!(page.contains("--data-urlencode 'drafts=[{"));
    assert!(page.contains("client.call_endpoint(url=\"/drafts\", method=\"POST\", request=request)"));
    assert!(page.contains("| `drafts` |"));
    assert!(page.contains("\"msg\": \"Invalid stream id\""));
}

#[tokio::test]
async fn test_page_uses_edit_fixture() {
    let (server, _) = test_server().await;

    let page = server.get("/api/v1/docs/edit-draft").await.text();

    assert!(page.contains("\"msg\": \"Draft does not exist\""));
    assert!(page.contains(&format!("curl -sSX PATCH {}/drafts/2", DEFAULT_API_SERVER_URL)));
}

#[tokio::test]
async fn test_unknown_page() {
    let (server, _) = test_server().await;

    let response = server.get("/api/v1/docs/send-message").await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["result"], "error");
    assert_eq!(body["code"], "BAD_REQUEST");
}
