//! Shared plumbing for incoming webhook integrations.
//!
//! Integrations turn a third-party payload into a topic and a message body,
//! then hand both to `WebhookService::check_send_webhook_message`. Problems a
//! bot owner needs to fix (missing headers, bad JSON, a missing stream) are
//! reported to the owner by private message, at most once per bot every
//! 30 minutes.

use crate::config::MessageLimits;
use crate::models::{Message, NewMessage, Recipient, UserProfile};
use crate::services::draft_service::{
    MESSAGE_TRUNCATION_SUFFIX, TOPIC_TRUNCATION_SUFFIX, truncate_content,
};
use crate::storage::{StorageBackend, StorageError};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::collections::BTreeMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Header names of the form HTTP_* are how integrations look up event headers.
pub const HTTP_HEADER_PREFIX: &str = "HTTP_";

const DEFAULT_TOPIC: &str = "(no topic)";

const MISSING_EVENT_HEADER_MESSAGE: &str = "Hi there!  Your bot {bot_name} just sent an HTTP request to {request_path} that
is missing the HTTP {header_name} header.  Because this header is how
{integration_name} indicates the event type, this usually indicates a configuration
issue, where you either entered the URL for a different integration, or are running
an older version of the third-party service that doesn't provide that header.
Contact {support_email} if you need help debugging!";

const INVALID_JSON_MESSAGE: &str = "Hi there! It looks like you tried to setup the {webhook_name} integration,
but didn't correctly configure the webhook to send data in the JSON format
that this integration expects!";

const MISSING_STREAM_MESSAGE: &str = "Hi there! We thought you'd like to know that your bot **{bot_name}** just
tried to send a message to stream `{stream_name}`, but that stream does not exist.
Create the stream or update the webhook URL to point at an existing one.";

#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("Missing the HTTP event header '{header}'")]
    MissingHttpEventHeader { header: String },
    #[error("API Callback to {endpoint} via. the \"{bot}\" bot failed with status {http_status_code}.")]
    ThirdPartyApiCallback {
        bot: String,
        endpoint: String,
        http_status_code: u16,
    },
    #[error("Ambassador must be a bot. {0} is not a bot")]
    NotABot(String),
    /// The bot is not configured the way the integration requires
    #[error("{0}")]
    Config(String),
    /// The request or payload cannot be processed
    #[error("{0}")]
    InvalidRequest(String),
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl WebhookError {
    /// Machine-readable error code for the JSON error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            WebhookError::MissingHttpEventHeader { .. } => "MISSING_HTTP_EVENT_HEADER",
            WebhookError::ThirdPartyApiCallback { .. } => "THIRD_PARTY_API_RESPONSE_ERROR",
            _ => "BAD_REQUEST",
        }
    }
}

/// Replace `{name}` placeholders in `template` with values from `args`.
fn fill_template(template: &str, args: &[(&str, &str)]) -> String {
    args.iter().fold(template.to_string(), |text, (name, value)| {
        text.replace(&format!("{{{}}}", name), value)
    })
}

/// Canonicalise header names: upper case, `-` becomes `_`, and everything
/// except CONTENT_TYPE/CONTENT_LENGTH gets the HTTP_ prefix.
pub fn standardize_headers<'a, I>(input_headers: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    input_headers
        .into_iter()
        .map(|(raw_header, value)| {
            let mut polished = raw_header.to_uppercase().replace('-', "_");
            if polished != "CONTENT_TYPE"
                && polished != "CONTENT_LENGTH"
                && !polished.starts_with(HTTP_HEADER_PREFIX)
            {
                polished = format!("{}{}", HTTP_HEADER_PREFIX, polished);
            }
            (polished, value.to_string())
        })
        .collect()
}

/// Headers for a test fixture named `event_type` or `event_type__details`.
///
/// For integrations whose event type header can be derived from the fixture
/// file name.
pub fn http_headers_from_filename(
    http_header_key: &str,
) -> impl Fn(&str) -> BTreeMap<String, String> + '_ {
    move |filename: &str| {
        let event_type = filename.split("__").next().unwrap_or(filename);
        BTreeMap::from([(http_header_key.to_string(), event_type.to_string())])
    }
}

/// Sends private messages from a bot to its owner, rate limited per bot.
pub struct BotOwnerNotifier {
    storage: Arc<dyn StorageBackend>,
    limiter: DefaultKeyedRateLimiter<i64>,
}

impl BotOwnerNotifier {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        // One notification per 30 minutes, no burst.
        let two = NonZeroU32::MIN.saturating_add(1);
        let quota = Quota::per_hour(two).allow_burst(NonZeroU32::MIN);
        Self {
            storage,
            limiter: RateLimiter::keyed(quota),
        }
    }

    /// Send `content` to the bot's owner unless the bot was notified recently.
    ///
    /// Returns the message when one was sent.
    pub async fn notify(
        &self,
        bot: &UserProfile,
        content: &str,
    ) -> Result<Option<Message>, StorageError> {
        let Some(owner_id) = bot.bot_owner_id else {
            return Ok(None);
        };
        if self.limiter.check_key(&bot.id).is_err() {
            debug!("Suppressing notification to owner of bot {}", bot.id);
            return Ok(None);
        }
        let message = self
            .storage
            .create_message(NewMessage {
                sender_id: bot.id,
                recipient: Recipient::Personal(owner_id),
                topic: String::new(),
                content: content.trim().to_string(),
            })
            .await?;
        info!("Notified owner {} of bot {}", owner_id, bot.id);
        Ok(Some(message))
    }
}

/// The parts of an incoming webhook request the helpers need.
#[derive(Debug, Clone)]
pub struct WebhookRequest {
    pub bot: UserProfile,
    /// Request path, used in notices to the bot owner
    pub path: String,
    /// `stream` query parameter
    pub stream: Option<String>,
    /// `topic` query parameter, overriding the integration's topic
    pub topic: Option<String>,
    /// Standardised headers (see `standardize_headers`)
    pub headers: BTreeMap<String, String>,
}

/// Webhook helpers bound to storage and configuration.
#[derive(Clone)]
pub struct WebhookService {
    storage: Arc<dyn StorageBackend>,
    notifier: Arc<BotOwnerNotifier>,
    limits: MessageLimits,
    support_email: String,
    http_client: reqwest::Client,
}

impl WebhookService {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        limits: MessageLimits,
        support_email: String,
    ) -> Self {
        Self {
            notifier: Arc::new(BotOwnerNotifier::new(storage.clone())),
            storage,
            limits,
            support_email,
            http_client: reqwest::Client::new(),
        }
    }

    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        &self.storage
    }

    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    pub fn notifier(&self) -> &BotOwnerNotifier {
        &self.notifier
    }

    /// Deliver an integration's message.
    ///
    /// Without a `stream` parameter the message goes privately to the bot
    /// owner. A stream that does not exist is reported to the owner and the
    /// message is dropped.
    pub async fn check_send_webhook_message(
        &self,
        request: &WebhookRequest,
        topic: &str,
        body: &str,
        unquote_url_parameters: bool,
    ) -> Result<Option<Message>, WebhookError> {
        let bot = &request.bot;
        let content = truncate_content(
            body,
            self.limits.max_message_length,
            MESSAGE_TRUNCATION_SUFFIX,
        );

        let Some(stream_name) = &request.stream else {
            let owner_id = bot.bot_owner_id.ok_or_else(|| {
                WebhookError::Config(format!("The \"{}\" bot has no owner.", bot.full_name))
            })?;
            let message = self
                .storage
                .create_message(NewMessage {
                    sender_id: bot.id,
                    recipient: Recipient::Personal(owner_id),
                    topic: String::new(),
                    content,
                })
                .await?;
            return Ok(Some(message));
        };

        // Some services double-escape their URLs, so %20 and friends survive
        // the first decode.
        let unquote = |value: &str| -> String {
            if unquote_url_parameters {
                urlencoding::decode(value)
                    .map(|decoded| decoded.into_owned())
                    .unwrap_or_else(|_| value.to_string())
            } else {
                value.to_string()
            }
        };
        let stream_name = unquote(stream_name);
        let topic = match &request.topic {
            Some(user_topic) => unquote(user_topic),
            None => topic.to_string(),
        };
        let topic = if topic.trim().is_empty() {
            DEFAULT_TOPIC.to_string()
        } else {
            truncate_content(&topic, self.limits.max_topic_length, TOPIC_TRUNCATION_SUFFIX)
        };

        let Some(stream) = self
            .storage
            .get_stream_by_name(bot.realm_id, &stream_name)
            .await?
        else {
            warn!(
                "Bot {} tried to send to missing stream {}",
                bot.id, stream_name
            );
            let notice = fill_template(
                MISSING_STREAM_MESSAGE,
                &[
                    ("bot_name", bot.full_name.as_str()),
                    ("stream_name", stream_name.as_str()),
                ],
            );
            self.notifier.notify(bot, &notice).await?;
            return Ok(None);
        };

        if !stream.is_accessible_by(bot.id, bot.realm_id) {
            return Err(WebhookError::InvalidRequest(format!(
                "Not authorized to send to stream '{}'",
                stream.name
            )));
        }

        let message = self
            .storage
            .create_message(NewMessage {
                sender_id: bot.id,
                recipient: Recipient::Stream(stream.id),
                topic,
                content,
            })
            .await?;
        Ok(Some(message))
    }

    /// Look up `HTTP_{header}` in the request headers.
    ///
    /// When the header is missing and `fatal` is set, the bot owner is told
    /// and the request fails.
    pub async fn validate_extract_webhook_http_header(
        &self,
        request: &WebhookRequest,
        header: &str,
        integration_name: &str,
        fatal: bool,
    ) -> Result<Option<String>, WebhookError> {
        let key = format!("{}{}", HTTP_HEADER_PREFIX, header);
        let extracted = request.headers.get(&key).cloned();
        if extracted.is_none() && fatal {
            let notice = fill_template(
                MISSING_EVENT_HEADER_MESSAGE,
                &[
                    ("bot_name", request.bot.full_name.as_str()),
                    ("request_path", request.path.as_str()),
                    ("header_name", header),
                    ("integration_name", integration_name),
                    ("support_email", self.support_email.as_str()),
                ],
            );
            self.notifier.notify(&request.bot, &notice).await?;
            return Err(WebhookError::MissingHttpEventHeader {
                header: header.to_string(),
            });
        }
        Ok(extracted)
    }

    /// Tell the bot owner the integration was sent something that isn't JSON.
    pub async fn notify_bot_owner_about_invalid_json(
        &self,
        bot: &UserProfile,
        webhook_client_name: &str,
    ) -> Result<Option<Message>, WebhookError> {
        let notice = fill_template(INVALID_JSON_MESSAGE, &[("webhook_name", webhook_client_name)]);
        Ok(self.notifier.notify(bot, &notice).await?)
    }
}
