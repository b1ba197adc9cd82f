//! Success and error envelopes shared by every endpoint.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const RESULT_SUCCESS: &str = "success";
pub const RESULT_ERROR: &str = "error";

/// A successful response with no additional values.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JsonSuccess {
    #[schema(example = "success")]
    pub result: String,
    #[schema(example = "")]
    pub msg: String,
}

impl JsonSuccess {
    pub fn new() -> Self {
        Self {
            result: RESULT_SUCCESS.to_string(),
            msg: String::new(),
        }
    }
}

impl Default for JsonSuccess {
    fn default() -> Self {
        Self::new()
    }
}

/// An error response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JsonError {
    #[schema(example = "error")]
    pub result: String,
    /// A human-readable description of the error.
    pub msg: String,
    /// A machine-readable error code.
    #[schema(example = "BAD_REQUEST")]
    pub code: String,
}

impl JsonError {
    pub fn new(msg: impl Into<String>, code: &str) -> Self {
        Self {
            result: RESULT_ERROR.to_string(),
            msg: msg.into(),
            code: code.to_string(),
        }
    }
}
