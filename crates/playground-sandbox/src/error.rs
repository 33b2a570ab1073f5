//! Error types for the playground sandbox.
//!
//! Two distinct shapes live here. [`SandboxError`] covers failures of the
//! sandbox machinery itself and is the only error the pipeline ever returns
//! as `Err`. Everything user-visible travels as data: policy violations as
//! [`crate::ValidationDiagnostic`]s and snippet runtime failures as
//! [`ErrorDetails`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Infrastructure failures of the sandbox itself.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// Code exceeds the configured maximum size.
    #[error("code exceeds maximum size of {max} bytes (got {actual})")]
    CodeTooLarge {
        /// Maximum allowed size.
        max: usize,
        /// Actual size.
        actual: usize,
    },

    /// Sandbox plumbing failed (thread, runtime construction, result
    /// channel).
    #[error("sandbox execution failed: {0}")]
    Execution(#[from] anyhow::Error),

    /// Result (de)serialization failed.
    #[error("result serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A snippet failure normalized into plain data.
///
/// Mirrors whatever the snippet threw: a structured error's message and name
/// plus its well-known fields, a bare string, or a plain object with its own
/// fields merged through `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Human-readable description of the failure.
    pub message: String,
    /// Error class tag: the thrown error's name, `"string"`, or `"unknown"`.
    #[serde(default)]
    pub kind: String,
    /// Machine-readable code copied from the thrown error, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<Value>,
    /// Extra payload copied from the thrown error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// Response body attached by a proxied operation, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    /// HTTP status attached by a proxied operation, when present.
    #[serde(
        default,
        rename = "statusCode",
        skip_serializing_if = "Option::is_none"
    )]
    pub status_code: Option<Value>,
    /// Stack trace, captured only when the runner is configured for it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    /// Remaining fields of a thrown plain object, merged through unchanged.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl ErrorDetails {
    /// Build a minimal error with the given message and kind.
    pub fn new(message: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: kind.into(),
            ..Self::default()
        }
    }

    /// JSON rendering used by the playground's result panel.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.message.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minimal_error_serializes_without_optional_fields() {
        let details = ErrorDetails::new("boom", "Error");
        let rendered = details.to_json_string();
        assert!(rendered.contains("\"message\":\"boom\""), "got: {rendered}");
        assert!(rendered.contains("\"kind\":\"Error\""), "got: {rendered}");
        assert!(!rendered.contains("statusCode"), "got: {rendered}");
        assert!(!rendered.contains("stack"), "got: {rendered}");
    }

    #[test]
    fn status_code_round_trips_in_camel_case() {
        let json = r#"{"message":"payment required","kind":"Error","statusCode":402}"#;
        let details: ErrorDetails = serde_json::from_str(json).unwrap();
        assert_eq!(details.status_code, Some(json!(402)));
        assert!(details.to_json_string().contains("\"statusCode\":402"));
    }

    #[test]
    fn unknown_fields_are_kept_in_extra() {
        let json = r#"{"message":"bad","kind":"unknown","hint":"check the id"}"#;
        let details: ErrorDetails = serde_json::from_str(json).unwrap();
        assert_eq!(details.extra.get("hint"), Some(&json!("check the id")));
        assert!(details.to_json_string().contains("\"hint\":\"check the id\""));
    }

    #[test]
    fn missing_kind_defaults_to_empty() {
        let details: ErrorDetails = serde_json::from_str(r#"{"message":"m"}"#).unwrap();
        assert_eq!(details.kind, "");
    }
}
