//! Unit tests for draft validation: structural checks on the JSON objects
//! and the recipient/content checks made against storage.

use drafts_api::config::MessageLimits;
use drafts_api::models::{DraftType, Recipient, Stream, UserProfile};
use drafts_api::services::DraftService;
use drafts_api::services::draft_service::{
    DraftInput, parse_draft, parse_draft_list, validate_draft_value,
};
use drafts_api::storage::{MemoryStorageBackend, StorageBackend};
use serde_json::json;
use std::sync::Arc;

fn message(result: Result<impl std::fmt::Debug, drafts_api::services::DraftError>) -> String {
    result.unwrap_err().to_string()
}

async fn service() -> (DraftService, UserProfile) {
    let storage = Arc::new(MemoryStorageBackend::new());
    let hamlet = UserProfile::new(1, 1, "hamlet@zulip.example", "King Hamlet", "k1");
    storage.create_user(hamlet.clone()).await.unwrap();
    storage
        .create_user(UserProfile::new(2, 1, "othello@zulip.example", "Othello", "k2"))
        .await
        .unwrap();
    storage
        .create_user(UserProfile::new(3, 2, "zoe@lear.example", "Zoe", "k3"))
        .await
        .unwrap();
    let mut former = UserProfile::new(4, 1, "former@zulip.example", "Former", "k4");
    former.is_active = false;
    storage.create_user(former).await.unwrap();
    let mut verona = Stream::new(1, 1, "Verona");
    verona.subscribers = vec![1];
    storage.create_stream(verona).await.unwrap();
    let mut secret = Stream::new(2, 1, "secret");
    secret.invite_only = true;
    storage.create_stream(secret).await.unwrap();

    let limits = MessageLimits {
        max_message_length: 20,
        max_topic_length: 8,
    };
    (DraftService::new(storage, limits), hamlet)
}

fn input(draft_type: DraftType, to: Vec<i64>, topic: &str, content: &str) -> DraftInput {
    DraftInput {
        draft_type,
        to,
        topic: topic.to_string(),
        content: content.to_string(),
        timestamp: Some(1_595_479_019.0),
    }
}

#[test]
fn test_validate_accepts_complete_draft() {
    let value = json!({
        "type": "stream",
        "to": [1],
        "topic": "sync drafts",
        "content": "Let's add backend support for syncing drafts.",
        "timestamp": 1595479019.5
    });
    let draft = validate_draft_value(&value, "draft").unwrap();
    assert_eq!(draft.draft_type, DraftType::Stream);
    assert_eq!(draft.to, vec![1]);
    assert_eq!(draft.timestamp, Some(1_595_479_019.5));

    let value = json!({"type": "", "to": [], "topic": "", "content": "x"});
    assert_eq!(validate_draft_value(&value, "draft").unwrap().timestamp, None);
}

#[test]
fn test_validate_reports_first_structural_problem() {
    let cases = [
        (json!("a string"), "draft is not a dict"),
        (json!({"type": "", "to": [], "content": "x"}), "topic key is missing from draft"),
        (
            json!({"type": 1, "to": [], "topic": "", "content": "x"}),
            "draft[\"type\"] is not a string",
        ),
        (
            json!({"type": "stream", "to": [1], "topic": 5, "content": "x"}),
            "draft[\"topic\"] is not a string",
        ),
        (
            json!({"type": "", "to": [], "topic": "", "content": ""}),
            "draft[\"content\"] cannot be blank.",
        ),
        (
            json!({"type": "", "to": [], "topic": "", "content": "x", "timestamp": null}),
            "draft[\"timestamp\"] is not an allowed_type",
        ),
    ];
    for (value, expected) in cases {
        assert_eq!(message(validate_draft_value(&value, "draft")), expected);
    }
}

#[test]
fn test_validate_checks_each_key_before_the_next() {
    let cases = [
        // A bad type is reported before a later key goes missing.
        (
            json!({"type": 1, "to": [], "topic": ""}),
            "draft[\"type\"] is not a string",
        ),
        (
            json!({"type": "stream", "to": "1"}),
            "draft[\"to\"] is not a list",
        ),
        // Unknown keys are only reported once every known key is valid.
        (
            json!({"type": "bogus", "to": [], "topic": "", "content": "x", "extra": 1}),
            "Invalid draft[\"type\"]",
        ),
        (
            json!({"type": "", "to": [], "topic": "", "content": "x", "timestamp": "soon", "extra": 1}),
            "draft[\"timestamp\"] is not an allowed_type",
        ),
        (
            json!({"type": "", "to": [], "topic": "", "content": "x", "zeta": 1, "extra": 2}),
            "Unexpected arguments: extra, zeta",
        ),
    ];
    for (value, expected) in cases {
        assert_eq!(message(validate_draft_value(&value, "draft")), expected);
    }
}

#[test]
fn test_parse_draft_list_names_the_bad_item() {
    let raw = json!([
        {"type": "", "to": [], "topic": "", "content": "fine"},
        {"type": "private", "to": [2.5], "topic": "", "content": "x"}
    ])
    .to_string();
    assert_eq!(
        message(parse_draft_list(&raw, "drafts")),
        "drafts[1][\"to\"][0] is not an integer"
    );
    assert_eq!(parse_draft_list("[]", "drafts").unwrap().len(), 0);
    assert_eq!(
        message(parse_draft_list("{}", "drafts")),
        "drafts is not a list"
    );
    assert_eq!(
        message(parse_draft("not json", "draft")),
        "Argument \"draft\" is not valid JSON."
    );
}

#[tokio::test]
async fn test_further_validate_stream_draft() {
    let (service, hamlet) = service().await;

    let valid = service
        .further_validate(
            &input(DraftType::Stream, vec![1], "a long topic", "short"),
            &hamlet,
        )
        .await
        .unwrap();
    assert_eq!(valid.recipient, Some(Recipient::Stream(1)));
    assert_eq!(valid.topic, "a lon...");
    assert_eq!(valid.content, "short");
    assert_eq!(valid.last_edit_time.timestamp(), 1_595_479_019);

    let err = service
        .further_validate(&input(DraftType::Stream, vec![2], "t", "x"), &hamlet)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid stream id");
}

#[tokio::test]
async fn test_further_validate_private_draft() {
    let (service, hamlet) = service().await;

    let valid = service
        .further_validate(&input(DraftType::Private, vec![2], "dropped", "hi"), &hamlet)
        .await
        .unwrap();
    assert_eq!(valid.recipient, Some(Recipient::Personal(2)));
    assert_eq!(valid.topic, "");

    let unaddressed = service
        .further_validate(&input(DraftType::Private, vec![], "", "hi"), &hamlet)
        .await
        .unwrap();
    assert_eq!(unaddressed.recipient, None);

    let err = service
        .further_validate(&input(DraftType::Private, vec![2, 3], "", "hi"), &hamlet)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid user ID 3");

    let err = service
        .further_validate(&input(DraftType::Private, vec![2, 4], "", "hi"), &hamlet)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "'former@zulip.example' is no longer using Zulip.");
}

#[tokio::test]
async fn test_further_validate_content() {
    let (service, hamlet) = service().await;

    let valid = service
        .further_validate(
            &input(DraftType::Unaddressed, vec![], "", "a message that is far too long"),
            &hamlet,
        )
        .await
        .unwrap();
    assert_eq!(valid.content.chars().count(), 20);
    assert!(valid.content.ends_with("\n[message truncated]"));

    let mut late = input(DraftType::Unaddressed, vec![], "", "x");
    late.timestamp = Some(1e13);
    let err = service.further_validate(&late, &hamlet).await.unwrap_err();
    assert_eq!(err.to_string(), "Timestamp is out of range.");
}

#[tokio::test]
async fn test_sync_disabled_blocks_draft_operations() {
    let (service, mut hamlet) = service().await;
    hamlet.enable_drafts_synchronization = false;

    let expected = "User has not enabled drafts syncing.";
    assert_eq!(message(service.fetch_drafts(&hamlet).await), expected);
    assert_eq!(
        message(
            service
                .create_drafts(&[input(DraftType::Unaddressed, vec![], "", "x")], &hamlet)
                .await
        ),
        expected
    );
    assert_eq!(message(service.delete_draft(1, &hamlet).await), expected);
}
