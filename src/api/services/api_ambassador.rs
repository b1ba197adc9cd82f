//! Outgoing HTTP calls made on behalf of an integration bot.
//!
//! Some webhook payloads only carry identifiers; the integration then calls
//! back into the third-party API to fetch the details. The ambassador keeps
//! the parameters every call needs (usually an API token) and a log of the
//! responses it received.

use super::webhook_service::WebhookError;
use crate::models::UserProfile;
use crate::storage::BotConfig;
use reqwest::Method;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Parameters attached to an outgoing request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestParams {
    /// Form fields (application/x-www-form-urlencoded body)
    pub data: BTreeMap<String, String>,
    /// JSON body fields, used when there are no form fields
    pub json: Map<String, Value>,
    /// Query string parameters
    pub params: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
}

impl RequestParams {
    pub fn with_data(mut self, key: &str, value: &str) -> Self {
        self.data.insert(key.to_string(), value.to_string());
        self
    }

    /// Overlay `other` on top of these parameters.
    pub fn update(&mut self, other: &RequestParams) {
        self.data.extend(other.data.clone());
        self.json.extend(other.json.clone());
        self.params.extend(other.params.clone());
        self.headers.extend(other.headers.clone());
    }
}

/// A response received by the ambassador.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn json(&self) -> Result<Value, WebhookError> {
        serde_json::from_str(&self.body).map_err(|e| {
            WebhookError::InvalidRequest(format!("Invalid JSON from {}: {}", self.url, e))
        })
    }
}

/// Where `ApiTokenAuth` places the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Url,
    Form,
    Json,
    Headers,
}

/// Authenticates an ambassador with a token stored in the bot's config.
#[derive(Debug, Clone, Copy)]
pub struct ApiTokenAuth {
    pub mode: AuthMode,
    /// Name of the parameter carrying the token
    pub param_key: &'static str,
    /// Bot config entry holding the token
    pub config_element_key: &'static str,
}

impl Default for ApiTokenAuth {
    fn default() -> Self {
        Self {
            mode: AuthMode::Form,
            param_key: "token",
            config_element_key: "api_token",
        }
    }
}

impl ApiTokenAuth {
    pub fn apply(
        &self,
        ambassador: &mut ThirdPartyApiAmbassador,
        config: &BotConfig,
    ) -> Result<(), WebhookError> {
        let api_token = config.get(self.config_element_key).ok_or_else(|| {
            WebhookError::Config(format!(
                "The \"{}\" bot is missing a configuration element: \"{}\"",
                ambassador.bot().full_name,
                self.config_element_key
            ))
        })?;

        let mut auth = RequestParams::default();
        match self.mode {
            AuthMode::Url => {
                auth.params
                    .insert(self.param_key.to_string(), api_token.clone());
            }
            AuthMode::Form => {
                auth.data.insert(self.param_key.to_string(), api_token.clone());
            }
            AuthMode::Json => {
                auth.json
                    .insert(self.param_key.to_string(), Value::String(api_token.clone()));
            }
            AuthMode::Headers => {
                auth.headers
                    .insert(self.param_key.to_string(), api_token.clone());
            }
        }
        ambassador.update_persistent_request_params(&auth);
        Ok(())
    }
}

/// Hook run before or after every request.
pub type RequestHook = Box<dyn Fn(&ThirdPartyApiAmbassador) + Send + Sync>;

/// HTTP client acting for a bot against a third-party API.
pub struct ThirdPartyApiAmbassador {
    bot: UserProfile,
    root_url: String,
    client: reqwest::Client,
    persistent_params: RequestParams,
    request_preprocessor: Option<RequestHook>,
    request_postprocessor: Option<RequestHook>,
    response_log: Vec<ApiResponse>,
}

impl std::fmt::Debug for ThirdPartyApiAmbassador {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThirdPartyApiAmbassador")
            .field("bot", &self.bot.full_name)
            .field("root_url", &self.root_url)
            .field("responses", &self.response_log.len())
            .finish()
    }
}

impl ThirdPartyApiAmbassador {
    /// Create an ambassador for `bot`; `root_url` may be empty when only
    /// absolute endpoints are called.
    pub fn new(
        bot: UserProfile,
        root_url: &str,
        client: reqwest::Client,
    ) -> Result<Self, WebhookError> {
        if !bot.is_bot {
            return Err(WebhookError::NotABot(bot.full_name));
        }
        Ok(Self {
            bot,
            root_url: root_url.trim_end_matches('/').to_string(),
            client,
            persistent_params: RequestParams::default(),
            request_preprocessor: None,
            request_postprocessor: None,
            response_log: Vec::new(),
        })
    }

    pub fn with_preprocessor(mut self, hook: RequestHook) -> Self {
        self.request_preprocessor = Some(hook);
        self
    }

    pub fn with_postprocessor(mut self, hook: RequestHook) -> Self {
        self.request_postprocessor = Some(hook);
        self
    }

    pub fn bot(&self) -> &UserProfile {
        &self.bot
    }

    pub fn persistent_request_params(&self) -> &RequestParams {
        &self.persistent_params
    }

    /// The most recent response, if any call was made.
    pub fn result(&self) -> Option<&ApiResponse> {
        self.response_log.last()
    }

    pub fn response_log(&self) -> &[ApiResponse] {
        &self.response_log
    }

    pub fn update_persistent_request_params(&mut self, params: &RequestParams) {
        self.persistent_params.update(params);
    }

    fn resolve_endpoint(&self, api_endpoint: &str) -> Result<String, WebhookError> {
        if !api_endpoint.starts_with('/') {
            return Ok(api_endpoint.to_string());
        }
        if self.root_url.is_empty() {
            return Err(WebhookError::InvalidRequest(format!(
                "{} attempted to call a relative URL address without a root URL.",
                self.bot.full_name
            )));
        }
        Ok(format!("{}{}", self.root_url, api_endpoint))
    }

    /// Call `api_endpoint` with `call_params` plus the persistent parameters.
    ///
    /// Relative endpoints are resolved against the root URL. Any status
    /// other than 200 is an error.
    pub async fn http_api_callback(
        &mut self,
        api_endpoint: &str,
        method: Method,
        call_params: RequestParams,
    ) -> Result<&ApiResponse, WebhookError> {
        let mut params = call_params;
        params.update(&self.persistent_params);

        if let Some(hook) = &self.request_preprocessor {
            hook(self);
        }

        let endpoint = self.resolve_endpoint(api_endpoint)?;
        let url = url::Url::parse(&endpoint)
            .map_err(|e| WebhookError::InvalidRequest(format!("Invalid URL {}: {}", endpoint, e)))?;

        let mut request = self.client.request(method, url);
        if !params.params.is_empty() {
            request = request.query(&params.params);
        }
        for (name, value) in &params.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if !params.data.is_empty() {
            request = request.form(&params.data);
        } else if !params.json.is_empty() {
            request = request.json(&Value::Object(params.json.clone()));
        }

        debug!("Bot {} calling {}", self.bot.id, endpoint);
        let response = request
            .send()
            .await
            .map_err(|e| WebhookError::Http(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| WebhookError::Http(e.to_string()))?;
        self.response_log.push(ApiResponse {
            url: endpoint.clone(),
            status,
            body,
        });

        if let Some(hook) = &self.request_postprocessor {
            hook(self);
        }

        if status != 200 {
            warn!("Callback to {} failed with status {}", endpoint, status);
            return Err(WebhookError::ThirdPartyApiCallback {
                bot: self.bot.full_name.clone(),
                endpoint,
                http_status_code: status,
            });
        }

        self.response_log
            .last()
            .ok_or_else(|| WebhookError::Http("response log is empty".to_string()))
    }
}
