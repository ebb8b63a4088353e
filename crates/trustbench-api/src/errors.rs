//! HTTP error shape, grounded on
//! `ThirdKeyAI-Symbiont::crates::runtime::src::api::types::ErrorResponse`.

use serde::{Deserialize, Serialize};

/// Uniform error body returned by every handler on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable message.
    pub error: String,
    /// Stable machine-readable code, e.g. `"JOB_NOT_FOUND"`.
    pub code: String,
    /// Optional structured detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    /// Build an error response with no extra detail.
    pub fn new(code: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self {
            error: error.to_string(),
            code: code.into(),
            details: None,
        }
    }
}
