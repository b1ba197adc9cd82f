//! Phabricator integration.
//!
//! Phabricator's webhook only sends object PHIDs, so commit events are
//! resolved through the Conduit API (diffusion.commit.search, then
//! diffusion.repository.search) using the bot's API token.

use super::api_ambassador::{ApiTokenAuth, AuthMode, RequestParams, ThirdPartyApiAmbassador};
use super::webhook_service::{WebhookError, WebhookRequest, WebhookService};
use crate::storage::BotConfig;
use reqwest::Method;
use serde_json::Value;
use tracing::info;

pub const INTEGRATION_NAME: &str = "Phabricator";
pub const INTEGRATION_ID: &str = "phabricator";

const PHABRICATOR_AUTH: ApiTokenAuth = ApiTokenAuth {
    mode: AuthMode::Form,
    param_key: "api.token",
    config_element_key: "phabricator_api_key",
};

/// What happened to the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhabricatorOutcome {
    /// Event type this integration does not report on
    Ignored { event_type: String },
    Sent { subject: String, body: String },
}

fn str_at<'a>(value: &'a Value, pointer: &str) -> Result<&'a str, WebhookError> {
    value.pointer(pointer).and_then(Value::as_str).ok_or_else(|| {
        WebhookError::InvalidRequest(format!(
            "Malformed {} data: missing {}",
            INTEGRATION_NAME, pointer
        ))
    })
}

/// Look up the commit and its repository, and describe them.
pub async fn commit_subject_and_body(
    payload: &Value,
    ambassador: &mut ThirdPartyApiAmbassador,
) -> Result<(String, String), WebhookError> {
    let object_phid = str_at(payload, "/object/phid")?;
    let commit = ambassador
        .http_api_callback(
            "/api/diffusion.commit.search",
            Method::POST,
            RequestParams::default().with_data("constraints[phids][0]", object_phid),
        )
        .await?
        .json()?;
    let cid: String = str_at(&commit, "/data/0/fields/identifier")?
        .chars()
        .take(9)
        .collect();
    let author = str_at(&commit, "/data/0/fields/author/name")?.to_string();
    let committer = str_at(&commit, "/data/0/fields/committer/name")?.to_string();
    let repository_phid = str_at(&commit, "/data/0/fields/repositoryPHID")?;

    let repository = ambassador
        .http_api_callback(
            "/api/diffusion.repository.search",
            Method::POST,
            RequestParams::default().with_data("constraints[phids][0]", repository_phid),
        )
        .await?
        .json()?;
    let repository_name = str_at(&repository, "/data/0/fields/name")?.to_string();

    let body = if author == committer {
        format!(
            "{} authored and committed commit {} to {}",
            author, cid, repository_name
        )
    } else {
        format!(
            "{} authored and {} committed commit {} to {}",
            author, committer, cid, repository_name
        )
    };
    Ok((repository_name, body))
}

fn ensure_configured(config: &BotConfig, bot_name: &str) -> Result<(), WebhookError> {
    if config.get("integration_id").map(String::as_str) != Some(INTEGRATION_ID) {
        return Err(WebhookError::Config(format!(
            "The \"{}\" bot was not setup as a Phabricator integration bot.",
            bot_name
        )));
    }
    Ok(())
}

/// Handle one Phabricator webhook delivery.
pub async fn handle_event(
    service: &WebhookService,
    request: &WebhookRequest,
    payload: &Value,
) -> Result<PhabricatorOutcome, WebhookError> {
    let event_type = str_at(payload, "/object/type")?;
    if event_type != "CMIT" {
        return Ok(PhabricatorOutcome::Ignored {
            event_type: event_type.to_string(),
        });
    }

    let config = service.storage().get_bot_config(request.bot.id).await?;
    ensure_configured(&config, &request.bot.full_name)?;
    let root_url = config.get("phabricator_root_url").ok_or_else(|| {
        WebhookError::Config(format!(
            "The \"{}\" bot is missing a configuration element: \"phabricator_root_url\"",
            request.bot.full_name
        ))
    })?;

    let mut ambassador = ThirdPartyApiAmbassador::new(
        request.bot.clone(),
        root_url,
        service.http_client().clone(),
    )?;
    PHABRICATOR_AUTH.apply(&mut ambassador, &config)?;

    let (subject, body) = commit_subject_and_body(payload, &mut ambassador).await?;
    service
        .check_send_webhook_message(request, &subject, &body, false)
        .await?;
    info!("Phabricator commit event delivered for bot {}", request.bot.id);
    Ok(PhabricatorOutcome::Sent { subject, body })
}
