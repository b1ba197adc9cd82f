//! Integration tests for PATCH /settings and the drafts synchronization switch.

#[path = "../common/mod.rs"]
mod common;

use axum::http::StatusCode;
use axum_test::{TestResponse, TestServer};
use common::{HAMLET, basic_auth, test_server};
use serde_json::{Value, json};

async fn update_settings(server: &TestServer, form: &[(&str, &str)]) -> TestResponse {
    let (name, value) = basic_auth(HAMLET);
    server
        .patch("/api/v1/settings")
        .add_header(name, value)
        .form(form)
        .await
}

async fn draft_count(server: &TestServer) -> Option<i64> {
    let (name, value) = basic_auth(HAMLET);
    let response = server.get("/api/v1/drafts").add_header(name, value).await;
    if response.status_code() != StatusCode::OK {
        return None;
    }
    response.json::<Value>()["count"].as_i64()
}

#[tokio::test]
async fn test_disabling_sync_deletes_drafts() {
    let (server, state) = test_server().await;
    let (name, value) = basic_auth(HAMLET);
    server
        .post("/api/v1/drafts")
        .add_header(name, value)
        .form(&[(
            "drafts",
            json!([{"type": "", "to": [], "topic": "", "content": "draft"}]).to_string(),
        )])
        .await;
    assert_eq!(draft_count(&server).await, Some(1));

    let response = update_settings(&server, &[("enable_drafts_synchronization", "false")]).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body, json!({"result": "success", "msg": ""}));

    let user = state.storage.get_user(1).await.unwrap().unwrap();
    assert!(!user.enable_drafts_synchronization);
    assert!(state.storage.list_drafts(1).await.unwrap().is_empty());
    assert_eq!(draft_count(&server).await, None);

    let response = update_settings(&server, &[("enable_drafts_synchronization", "true")]).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(draft_count(&server).await, Some(0));
}

#[tokio::test]
async fn test_settings_without_parameters_is_a_no_op() {
    let (server, state) = test_server().await;

    let response = update_settings(&server, &[]).await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let user = state.storage.get_user(1).await.unwrap().unwrap();
    assert!(user.enable_drafts_synchronization);
}

#[tokio::test]
async fn test_settings_rejects_undecodable_body() {
    let (server, state) = test_server().await;
    let (name, value) = basic_auth(HAMLET);

    let response = server
        .patch("/api/v1/settings")
        .add_header(name, value)
        .json(&json!({"enable_drafts_synchronization": false}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["result"], "error");
    assert_eq!(body["code"], "BAD_REQUEST");

    let user = state.storage.get_user(1).await.unwrap().unwrap();
    assert!(user.enable_drafts_synchronization);
}

#[tokio::test]
async fn test_settings_rejects_non_boolean() {
    let (server, _) = test_server().await;

    let response = update_settings(&server, &[("enable_drafts_synchronization", "1")]).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["msg"], "enable_drafts_synchronization is not a boolean");

    let response = update_settings(&server, &[("enable_drafts_synchronization", "yes")]).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(
        body["msg"],
        "Argument \"enable_drafts_synchronization\" is not valid JSON."
    );
}

#[tokio::test]
async fn test_settings_requires_authentication() {
    let (server, _) = test_server().await;

    let response = server
        .patch("/api/v1/settings")
        .form(&[("enable_drafts_synchronization", "false")])
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}
