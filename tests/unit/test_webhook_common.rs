//! Unit tests for the shared webhook helpers: header handling, message
//! delivery and notices to bot owners.

use drafts_api::config::MessageLimits;
use drafts_api::models::{Recipient, Stream, UserProfile};
use drafts_api::services::webhook_service::{http_headers_from_filename, standardize_headers};
use drafts_api::services::{WebhookError, WebhookRequest, WebhookService};
use drafts_api::storage::{MemoryStorageBackend, StorageBackend};
use std::collections::BTreeMap;
use std::sync::Arc;

const OWNER_ID: i64 = 1;

fn bot() -> UserProfile {
    UserProfile::new(10, 1, "webhook-bot@zulip.example", "Zulip Webhook Bot", "bot-key")
        .into_bot(OWNER_ID)
}

async fn service() -> (WebhookService, Arc<MemoryStorageBackend>) {
    let storage = Arc::new(MemoryStorageBackend::new());
    storage
        .create_user(UserProfile::new(OWNER_ID, 1, "iago@zulip.example", "Iago", "k1"))
        .await
        .unwrap();
    storage.create_user(bot()).await.unwrap();
    storage
        .create_stream(Stream::new(1, 1, "Verona"))
        .await
        .unwrap();
    storage
        .create_stream(Stream::new(2, 1, "team chat"))
        .await
        .unwrap();
    let mut secret = Stream::new(3, 1, "secret");
    secret.invite_only = true;
    storage.create_stream(secret).await.unwrap();

    let limits = MessageLimits {
        max_message_length: 100,
        max_topic_length: 12,
    };
    let service = WebhookService::new(
        storage.clone(),
        limits,
        "support@zulip.example".to_string(),
    );
    (service, storage)
}

fn request(stream: Option<&str>, topic: Option<&str>) -> WebhookRequest {
    WebhookRequest {
        bot: bot(),
        path: "/api/v1/external/helloworld".to_string(),
        stream: stream.map(str::to_string),
        topic: topic.map(str::to_string),
        headers: BTreeMap::new(),
    }
}

#[test]
fn test_standardize_headers_from_request() {
    let headers = standardize_headers([
        ("x-github-event", "push"),
        ("Content-Type", "application/json"),
        ("user-agent", "GitHub-Hookshot/1"),
    ]);
    assert_eq!(
        headers,
        BTreeMap::from([
            ("CONTENT_TYPE".to_string(), "application/json".to_string()),
            ("HTTP_USER_AGENT".to_string(), "GitHub-Hookshot/1".to_string()),
            ("HTTP_X_GITHUB_EVENT".to_string(), "push".to_string()),
        ])
    );
}

#[test]
fn test_http_headers_from_filename() {
    let headers_for = http_headers_from_filename("HTTP_X_GITHUB_EVENT");
    assert_eq!(
        headers_for("pull_request__merged")["HTTP_X_GITHUB_EVENT"],
        "pull_request"
    );
    assert_eq!(headers_for("push")["HTTP_X_GITHUB_EVENT"], "push");
}

#[tokio::test]
async fn test_message_without_stream_goes_to_owner() {
    let (service, storage) = service().await;

    let message = service
        .check_send_webhook_message(&request(None, None), "ignored", "Hello owner", false)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(message.recipient, Recipient::Personal(OWNER_ID));
    assert_eq!(message.topic, "");
    assert_eq!(message.content, "Hello owner");
    assert_eq!(storage.list_messages_by_sender(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_message_to_stream_and_topic_override() {
    let (service, _) = service().await;

    let message = service
        .check_send_webhook_message(&request(Some("Verona"), None), "builds", "ok", false)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(message.recipient, Recipient::Stream(1));
    assert_eq!(message.topic, "builds");

    let message = service
        .check_send_webhook_message(
            &request(Some("team%20chat"), Some("my%20topic")),
            "builds",
            "ok",
            true,
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(message.recipient, Recipient::Stream(2));
    assert_eq!(message.topic, "my topic");
}

#[tokio::test]
async fn test_topic_defaults_and_truncation() {
    let (service, _) = service().await;

    let message = service
        .check_send_webhook_message(&request(Some("Verona"), None), "  ", "ok", false)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(message.topic, "(no topic)");

    let message = service
        .check_send_webhook_message(
            &request(Some("Verona"), None),
            "a very long topic name",
            "ok",
            false,
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(message.topic, "a very lo...");
}

#[tokio::test]
async fn test_missing_stream_notifies_owner_once() {
    let (service, storage) = service().await;

    for _ in 0..3 {
        let sent = service
            .check_send_webhook_message(&request(Some("nowhere"), None), "t", "body", false)
            .await
            .unwrap();
        assert!(sent.is_none());
    }

    let messages = storage.list_messages_by_sender(10).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].recipient, Recipient::Personal(OWNER_ID));
    assert!(messages[0].content.contains("**Zulip Webhook Bot**"));
    assert!(messages[0].content.contains("stream `nowhere`"));
}

#[tokio::test]
async fn test_invite_only_stream_requires_subscription() {
    let (service, _) = service().await;

    let err = service
        .check_send_webhook_message(&request(Some("secret"), None), "t", "body", false)
        .await
        .unwrap_err();

    assert!(matches!(err, WebhookError::InvalidRequest(_)));
    assert_eq!(err.to_string(), "Not authorized to send to stream 'secret'");
}

#[tokio::test]
async fn test_validate_extract_webhook_http_header() {
    let (service, storage) = service().await;
    let mut with_header = request(None, None);
    with_header.headers = standardize_headers([("X-Event-Type", "push")]);

    let found = service
        .validate_extract_webhook_http_header(&with_header, "X_EVENT_TYPE", "Hello World", true)
        .await
        .unwrap();
    assert_eq!(found.as_deref(), Some("push"));

    let optional = service
        .validate_extract_webhook_http_header(&request(None, None), "X_EVENT_TYPE", "Hello World", false)
        .await
        .unwrap();
    assert_eq!(optional, None);
    assert!(storage.list_messages_by_sender(10).await.unwrap().is_empty());

    let err = service
        .validate_extract_webhook_http_header(&request(None, None), "X_EVENT_TYPE", "Hello World", true)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "MISSING_HTTP_EVENT_HEADER");

    let notices = storage.list_messages_by_sender(10).await.unwrap();
    assert_eq!(notices.len(), 1);
    let notice = &notices[0].content;
    assert!(notice.contains("Your bot Zulip Webhook Bot just sent an HTTP request to /api/v1/external/helloworld"));
    assert!(notice.contains("missing the HTTP X_EVENT_TYPE header"));
    assert!(notice.contains("Hello World indicates the event type"));
    assert!(notice.contains("Contact support@zulip.example"));
}

#[tokio::test]
async fn test_invalid_json_notice() {
    let (service, _) = service().await;

    let notice = service
        .notify_bot_owner_about_invalid_json(&bot(), "Phabricator")
        .await
        .unwrap()
        .unwrap();
    assert!(notice.content.starts_with("Hi there! It looks like you tried to setup the Phabricator integration"));

    // Rate limited per bot.
    let again = service
        .notify_bot_owner_about_invalid_json(&bot(), "Phabricator")
        .await
        .unwrap();
    assert!(again.is_none());
}

#[tokio::test]
async fn test_bot_without_owner() {
    let (service, _) = service().await;
    let mut orphan = request(None, None);
    orphan.bot.bot_owner_id = None;

    assert!(service.notifier().notify(&orphan.bot, "hi").await.unwrap().is_none());
    let err = service
        .check_send_webhook_message(&orphan, "t", "body", false)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "The \"Zulip Webhook Bot\" bot has no owner.");
}
