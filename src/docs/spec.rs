//! Registry of OpenAPI documents referenced by templates.

use super::DocsError;
use super::macros::Endpoint;
use crate::api::openapi::ApiDoc;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use utoipa::OpenApi;

/// Names under which the served API document is registered.
pub const API_SPEC_NAMES: &[&str] = &["openapi.json", "zulip.yaml"];

const MAX_REF_DEPTH: usize = 16;

/// An operation looked up in a registered document.
#[derive(Debug, Clone, Copy)]
pub struct Operation<'a> {
    pub document: &'a Value,
    pub value: &'a Value,
}

impl<'a> Operation<'a> {
    pub fn resolve(&self, value: &'a Value) -> &'a Value {
        resolve_ref(self.document, value)
    }

    pub fn description(&self) -> Option<&'a str> {
        self.value
            .get("description")
            .and_then(Value::as_str)
            .filter(|d| !d.trim().is_empty())
            .or_else(|| self.value.get("summary").and_then(Value::as_str))
    }

    /// Path and query parameters, with `$ref`s followed.
    pub fn parameters(&self) -> Vec<&'a Value> {
        self.value
            .get("parameters")
            .and_then(Value::as_array)
            .map(|params| params.iter().map(|p| self.resolve(p)).collect())
            .unwrap_or_default()
    }

    /// Schema of the request body, whatever its media type.
    pub fn request_body_schema(&self) -> Option<&'a Value> {
        let content = self.value.pointer("/requestBody/content")?.as_object()?;
        let media = content
            .get("application/x-www-form-urlencoded")
            .or_else(|| content.get("application/json"))
            .or_else(|| content.values().next())?;
        media.get("schema").map(|schema| self.resolve(schema))
    }

    /// Unless marked optional, a request body is required.
    pub fn request_body_required(&self) -> bool {
        self.value
            .pointer("/requestBody/required")
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }

    /// JSON content of the response documented for `status`.
    pub fn response_content(&self, status: u16) -> Option<&'a Value> {
        let response = self.value.pointer(&format!("/responses/{}", status))?;
        self.resolve(response).pointer("/content/application~1json")
    }
}

/// Follow `#/...` references within `document`.
pub fn resolve_ref<'a>(document: &'a Value, value: &'a Value) -> &'a Value {
    let mut current = value;
    for _ in 0..MAX_REF_DEPTH {
        let target = current
            .get("$ref")
            .and_then(Value::as_str)
            .and_then(|reference| reference.strip_prefix('#'))
            .and_then(|pointer| document.pointer(pointer));
        match target {
            Some(next) => current = next,
            None => break,
        }
    }
    current
}

#[derive(Debug, Clone, Default)]
pub struct SpecRegistry {
    documents: BTreeMap<String, Value>,
}

impl SpecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the served API document.
    pub fn with_api_doc() -> Result<Self, DocsError> {
        let document = serde_json::to_value(ApiDoc::openapi()).map_err(|e| DocsError::Load {
            path: "openapi.json".to_string(),
            message: e.to_string(),
        })?;
        let mut registry = Self::new();
        for name in API_SPEC_NAMES {
            registry.insert(name, document.clone());
        }
        Ok(registry)
    }

    pub fn insert(&mut self, name: &str, document: Value) {
        self.documents.insert(name.to_string(), document);
    }

    /// Register a JSON or YAML document under its file name.
    pub fn load_file(&mut self, path: &Path) -> Result<String, DocsError> {
        let load_error = |message: String| DocsError::Load {
            path: path.display().to_string(),
            message,
        };
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| load_error("path has no file name".to_string()))?
            .to_string();
        let raw = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
        let document: Value = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&raw).map_err(|e| load_error(e.to_string()))?,
            _ => serde_yaml::from_str(&raw).map_err(|e| load_error(e.to_string()))?,
        };
        self.insert(&name, document);
        Ok(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Result<&Value, DocsError> {
        self.documents
            .get(name)
            .ok_or_else(|| DocsError::UnknownSpecFile(name.to_string()))
    }

    /// Look up an operation; macros that name no document use the first
    /// registered API document.
    pub fn operation(
        &self,
        spec_file: Option<&str>,
        endpoint: &Endpoint,
    ) -> Result<Operation<'_>, DocsError> {
        let document = match spec_file {
            Some(name) => self.get(name)?,
            None => API_SPEC_NAMES
                .iter()
                .find_map(|name| self.documents.get(*name))
                .or_else(|| self.documents.values().next())
                .ok_or_else(|| DocsError::UnknownSpecFile(API_SPEC_NAMES[0].to_string()))?,
        };
        let value = document
            .get("paths")
            .and_then(|paths| paths.get(&endpoint.path))
            .and_then(|item| item.get(&endpoint.method))
            .ok_or_else(|| DocsError::UnknownEndpoint(endpoint.to_string()))?;
        Ok(Operation { document, value })
    }
}
