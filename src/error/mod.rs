//! Error handling for lore.
//!
//! This module provides:
//! - [`LoreError`]: The main error enum for all lore operations
//! - [`ErrorCode`]: Standardized error codes for machine parsing
//! - [`StructuredError`]: Rich error type with suggestions and context
//!
//! Failures local to one layer or one topic are normally absorbed into load
//! results and statistics; only invalid configuration and total index-build
//! failures reach callers as `Err`.

mod codes;
mod suggestions;

use std::io;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use codes::ErrorCode;
pub use suggestions::{suggest_for_error, suggest_similar_topics};

/// Main error type for lore operations.
#[derive(Error, Debug)]
pub enum LoreError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Topic not found: {0}")]
    TopicNotFound(String),

    #[error("Specialist not found: {0}")]
    SpecialistNotFound(String),

    #[error("Invalid topic format: {0}")]
    InvalidTopic(String),

    #[error("Search index error: {0}")]
    SearchIndex(#[from] tantivy::TantivyError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Query parse error: {0}")]
    QueryParse(String),

    #[error("Invalid detection pattern '{name}': {reason}")]
    InvalidPattern { name: String, reason: String },

    #[error("Layer '{layer}' failed to load: {reason}")]
    LayerLoad { layer: String, reason: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid configuration: {}", .issues.join("; "))]
    InvalidConfig { issues: Vec<String> },

    #[error("Missing required config: {0}")]
    MissingConfig(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Timeout: {0}")]
    Timeout(String),
}

impl LoreError {
    /// Get the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Git(_) => ErrorCode::GitError,
            Self::Io(_) => ErrorCode::IoError,
            Self::TopicNotFound(_) => ErrorCode::TopicNotFound,
            Self::SpecialistNotFound(_) => ErrorCode::SpecialistNotFound,
            Self::InvalidTopic(_) => ErrorCode::TopicInvalid,
            Self::SearchIndex(_) => ErrorCode::IndexBuildFailed,
            Self::Json(_) | Self::Yaml(_) => ErrorCode::SerializationError,
            Self::QueryParse(_) => ErrorCode::SearchQueryInvalid,
            Self::InvalidPattern { .. } => ErrorCode::PatternInvalid,
            Self::LayerLoad { .. } => ErrorCode::LayerLoadFailed,
            Self::Config(_) | Self::InvalidConfig { .. } => ErrorCode::ConfigInvalid,
            Self::MissingConfig(_) => ErrorCode::ConfigMissingRequired,
            Self::NotImplemented(_) => ErrorCode::NotImplemented,
            Self::Timeout(_) => ErrorCode::LayerTimeout,
        }
    }

    /// Get context information for this error as JSON.
    #[must_use]
    pub fn context(&self) -> Option<Value> {
        match self {
            Self::TopicNotFound(id) => Some(serde_json::json!({ "topic_id": id })),
            Self::SpecialistNotFound(id) => Some(serde_json::json!({ "specialist_id": id })),
            Self::InvalidTopic(reason) => Some(serde_json::json!({ "reason": reason })),
            Self::InvalidPattern { name, reason } => {
                Some(serde_json::json!({ "pattern": name, "reason": reason }))
            }
            Self::LayerLoad { layer, reason } => {
                Some(serde_json::json!({ "layer": layer, "reason": reason }))
            }
            Self::InvalidConfig { issues } => Some(serde_json::json!({ "issues": issues })),
            Self::MissingConfig(key) => Some(serde_json::json!({ "config_key": key })),
            _ => None,
        }
    }

    /// Convert this error to a structured error.
    #[must_use]
    pub fn to_structured(&self) -> StructuredError {
        StructuredError::from_lore_error(self)
    }
}

/// A structured error with machine-readable code, suggestion, and context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// The error code (e.g., "TOPIC_NOT_FOUND")
    pub code: ErrorCode,

    /// The numeric error code (e.g., 101)
    pub numeric_code: u16,

    /// Human-readable error message
    pub message: String,

    /// Actionable suggestion for recovery
    pub suggestion: String,

    /// Additional context for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,

    /// Whether this error is potentially recoverable by the user
    pub recoverable: bool,

    /// Error category (e.g., "topic", "config", "layer")
    pub category: String,
}

impl StructuredError {
    /// Create a new structured error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            numeric_code: code.numeric(),
            suggestion: code.suggestion().to_string(),
            context: None,
            recoverable: code.is_recoverable(),
            category: code.category().to_string(),
            code,
            message: message.into(),
        }
    }

    /// Create a structured error from a `LoreError`.
    #[must_use]
    pub fn from_lore_error(err: &LoreError) -> Self {
        let code = err.code();
        let context = err.context();
        let suggestion = suggest_for_error(code, context.as_ref());

        Self {
            code,
            numeric_code: code.numeric(),
            message: err.to_string(),
            suggestion,
            context,
            recoverable: code.is_recoverable(),
            category: code.category().to_string(),
        }
    }

    /// Add context to this error.
    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self.suggestion = suggest_for_error(self.code, self.context.as_ref());
        self
    }
}

impl std::fmt::Display for StructuredError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl From<LoreError> for StructuredError {
    fn from(err: LoreError) -> Self {
        Self::from_lore_error(&err)
    }
}

impl From<&LoreError> for StructuredError {
    fn from(err: &LoreError) -> Self {
        Self::from_lore_error(err)
    }
}

/// Result type alias using `LoreError`.
pub type Result<T> = std::result::Result<T, LoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        assert_eq!(
            LoreError::TopicNotFound("x".into()).code(),
            ErrorCode::TopicNotFound
        );
        assert_eq!(
            LoreError::InvalidConfig { issues: vec![] }.code(),
            ErrorCode::ConfigInvalid
        );
        assert_eq!(
            LoreError::NotImplemented("http layer".into()).code(),
            ErrorCode::NotImplemented
        );
        assert_eq!(
            LoreError::Timeout("git".into()).code(),
            ErrorCode::LayerTimeout
        );
    }

    #[test]
    fn test_invalid_config_message_joins_issues() {
        let err = LoreError::InvalidConfig {
            issues: vec![
                "layers[0].name: must not be empty".into(),
                "loading.max_concurrent_loads: must be at least 1".into(),
            ],
        };
        let message = err.to_string();
        assert!(message.contains("layers[0].name"));
        assert!(message.contains("; loading.max_concurrent_loads"));
    }

    #[test]
    fn test_structured_error_from_lore_error() {
        let err = LoreError::TopicNotFound("performance/findset".into());
        let structured = StructuredError::from_lore_error(&err);

        assert_eq!(structured.code, ErrorCode::TopicNotFound);
        assert_eq!(structured.numeric_code, 101);
        assert!(structured.message.contains("performance/findset"));
        assert!(structured.suggestion.contains("performance/findset"));
        assert!(structured.recoverable);
        assert_eq!(structured.category, "topic");
    }

    #[test]
    fn test_structured_error_serialization() {
        let err = StructuredError::new(ErrorCode::LayerLoadFailed, "layer 'company' failed");
        let json = serde_json::to_string(&err).unwrap();

        assert!(json.contains("LAYER_LOAD_FAILED"));
        assert!(json.contains("\"numeric_code\":501"));
        assert!(json.contains("\"category\":\"layer\""));
    }

    #[test]
    fn test_structured_error_display() {
        let err = StructuredError::new(ErrorCode::TopicNotFound, "Topic 'x' not found");
        assert_eq!(err.to_string(), "[E101] Topic 'x' not found");
    }

    #[test]
    fn test_layer_load_context() {
        let err = LoreError::LayerLoad {
            layer: "company".into(),
            reason: "unreachable".into(),
        };
        let structured: StructuredError = (&err).into();
        assert_eq!(structured.context.unwrap()["layer"], "company");
        assert!(structured.suggestion.contains("company"));
    }
}
