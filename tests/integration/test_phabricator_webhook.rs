//! Integration tests for the Phabricator webhook.
//!
//! A local Conduit stand-in answers the diffusion.commit.search and
//! diffusion.repository.search callbacks the integration makes.

#[path = "../common/mod.rs"]
mod common;

use axum::{Form, Json, Router, http::StatusCode, routing::post};
use axum_test::{TestResponse, TestServer};
use common::{PHABRICATOR_BOT_KEY, UNCONFIGURED_BOT_KEY, test_server};
use drafts_api::models::Recipient;
use drafts_api::routes::AppState;
use serde_json::{Value, json};
use std::collections::HashMap;

const CONDUIT_TOKEN: &str = "api-f6bd3xtoawh3egc6iazurmrcaqap";
const REPOSITORY_PHID: &str = "PHID-REPO-3yl4kpx4wtyzv3nvmmk4";

fn unauthorized() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error_code": "ERR-INVALID-AUTH", "result": null})),
    )
}

async fn commit_search(
    Form(form): Form<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    if form.get("api.token").map(String::as_str) != Some(CONDUIT_TOKEN) {
        return unauthorized();
    }
    let phid = form.get("constraints[phids][0]").cloned().unwrap_or_default();
    let committer = match phid.as_str() {
        "PHID-CMIT-merged" => "Tim Abbott",
        _ => "Hemanth V. Alluri",
    };
    (
        StatusCode::OK,
        Json(json!({
            "data": [{
                "id": 33,
                "type": "CMIT",
                "phid": phid,
                "fields": {
                    "identifier": "229bb58fa6d69e8dbd1dd6a15bdbb4e1b01e4e0e",
                    "repositoryPHID": REPOSITORY_PHID,
                    "author": {"name": "Hemanth V. Alluri", "email": "hdrive1999@gmail.com"},
                    "committer": {"name": committer, "email": "hdrive1999@gmail.com"},
                    "message": "Add README."
                }
            }],
            "cursor": {"limit": 100, "after": null, "before": null}
        })),
    )
}

async fn repository_search(
    Form(form): Form<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    if form.get("api.token").map(String::as_str) != Some(CONDUIT_TOKEN) {
        return unauthorized();
    }
    assert_eq!(
        form.get("constraints[phids][0]").map(String::as_str),
        Some(REPOSITORY_PHID)
    );
    (
        StatusCode::OK,
        Json(json!({
            "data": [{
                "id": 1,
                "type": "REPO",
                "phid": REPOSITORY_PHID,
                "fields": {"name": "Zulip x Phabricator", "callsign": "ZXP"}
            }]
        })),
    )
}

/// Start the Conduit stand-in and return its root URL.
async fn spawn_conduit() -> String {
    let app = Router::new()
        .route("/api/diffusion.commit.search", post(commit_search))
        .route("/api/diffusion.repository.search", post(repository_search));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn server_with_conduit(api_key: &str) -> (TestServer, AppState) {
    let (server, state) = test_server().await;
    let root_url = spawn_conduit().await;
    for (key, value) in [
        ("phabricator_root_url", root_url.as_str()),
        ("phabricator_api_key", api_key),
    ] {
        state
            .storage
            .set_bot_config(10, key.to_string(), value.to_string())
            .await
            .unwrap();
    }
    (server, state)
}

fn commit_payload(phid: &str) -> Value {
    json!({
        "object": {"type": "CMIT", "phid": phid},
        "triggers": [{"phid": "PHID-HRUL-xfbh5gwrwwhnwcqqljd6"}],
        "action": {"test": false, "silent": false, "secure": false, "epoch": 1550948373},
        "transactions": [{"phid": "PHID-XACT-CMIT-d2ljyzd4mf35rnb"}]
    })
}

async fn deliver(server: &TestServer, api_key: &str, stream: Option<&str>, payload: &Value) -> TestResponse {
    let mut request = server
        .post("/api/v1/external/phabricator")
        .add_query_param("api_key", api_key);
    if let Some(stream) = stream {
        request = request.add_query_param("stream", stream);
    }
    request.json(payload).await
}

#[tokio::test]
async fn test_commit_successful() {
    let (server, state) = server_with_conduit(CONDUIT_TOKEN).await;

    let response = deliver(
        &server,
        PHABRICATOR_BOT_KEY,
        Some("commits"),
        &commit_payload("PHID-CMIT-ozq3dnmfuu6pxfbfrcgm"),
    )
    .await;

    assert_eq!(response.status_code(), StatusCode::OK, "{}", response.text());
    let body: Value = response.json();
    assert_eq!(body, json!({"result": "success", "msg": ""}));

    let messages = state.storage.list_messages_by_sender(10).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].recipient, Recipient::Stream(4));
    assert_eq!(messages[0].topic, "Zulip x Phabricator");
    assert_eq!(
        messages[0].content,
        "Hemanth V. Alluri authored and committed commit 229bb58fa to Zulip x Phabricator"
    );
}

#[tokio::test]
async fn test_commit_with_different_committer() {
    let (server, state) = server_with_conduit(CONDUIT_TOKEN).await;

    let response = deliver(
        &server,
        PHABRICATOR_BOT_KEY,
        Some("commits"),
        &commit_payload("PHID-CMIT-merged"),
    )
    .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let messages = state.storage.list_messages_by_sender(10).await.unwrap();
    assert_eq!(
        messages[0].content,
        "Hemanth V. Alluri authored and Tim Abbott committed commit 229bb58fa to Zulip x Phabricator"
    );
}

#[tokio::test]
async fn test_commit_without_stream_goes_to_owner() {
    let (server, state) = server_with_conduit(CONDUIT_TOKEN).await;

    let response = deliver(
        &server,
        PHABRICATOR_BOT_KEY,
        None,
        &commit_payload("PHID-CMIT-ozq3dnmfuu6pxfbfrcgm"),
    )
    .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let messages = state.storage.list_messages_by_sender(10).await.unwrap();
    assert_eq!(messages[0].recipient, Recipient::Personal(1));
}

#[tokio::test]
async fn test_other_events_are_ignored() {
    let (server, state) = test_server().await;

    let payload = json!({"object": {"type": "TASK", "phid": "PHID-TASK-xyz"}});
    let response = deliver(&server, PHABRICATOR_BOT_KEY, Some("commits"), &payload).await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(state.storage.list_messages_by_sender(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_commit_with_insufficient_configuration() {
    let (server, _) = test_server().await;

    let response = deliver(
        &server,
        UNCONFIGURED_BOT_KEY,
        Some("commits"),
        &commit_payload("PHID-CMIT-ozq3dnmfuu6pxfbfrcgm"),
    )
    .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(
        body["msg"],
        "The \"Zulip Webhook Bot\" bot was not setup as a Phabricator integration bot."
    );
}

#[tokio::test]
async fn test_conduit_rejects_token() {
    let (server, state) = server_with_conduit("not-the-right-token").await;

    let response = deliver(
        &server,
        PHABRICATOR_BOT_KEY,
        Some("commits"),
        &commit_payload("PHID-CMIT-ozq3dnmfuu6pxfbfrcgm"),
    )
    .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "THIRD_PARTY_API_RESPONSE_ERROR");
    assert!(
        body["msg"]
            .as_str()
            .unwrap()
            .contains("via. the \"Phabricator Bot\" bot failed with status 401.")
    );
    assert!(state.storage.list_messages_by_sender(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_payloads() {
    let (server, state) = test_server().await;

    let response = server
        .post("/api/v1/external/phabricator")
        .add_query_param("api_key", PHABRICATOR_BOT_KEY)
        .text("this is not json")
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["msg"], "Malformed JSON");

    let notices = state.storage.list_messages_by_sender(10).await.unwrap();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].recipient, Recipient::Personal(1));
    assert!(notices[0].content.contains("the Phabricator integration"));

    let response = deliver(&server, PHABRICATOR_BOT_KEY, None, &json!({"object": {}})).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["msg"], "Malformed Phabricator data: missing /object/type");
}

#[tokio::test]
async fn test_webhook_authentication() {
    let (server, _) = test_server().await;
    let payload = commit_payload("PHID-CMIT-ozq3dnmfuu6pxfbfrcgm");

    let response = server
        .post("/api/v1/external/phabricator")
        .json(&payload)
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["msg"], "Missing 'api_key' argument");

    let response = deliver(&server, "no-such-key", None, &payload).await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["msg"], "Invalid API key");

    let response = deliver(&server, common::HAMLET.1, None, &payload).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>()["msg"],
        "This API is only available to incoming webhook bots."
    );
}
