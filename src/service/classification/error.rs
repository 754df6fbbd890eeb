//! Error types for document classification

use thiserror::Error;

/// Why a category set was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CategoryConfigError {
    #[error("expected between {min} and {max} categories, got {count}")]
    CountOutOfRange { count: usize, min: usize, max: usize },

    #[error("category at position {index} has an empty name")]
    EmptyName { index: usize },

    #[error("duplicate category names: {}", .0.join(", "))]
    DuplicateNames(Vec<String>),

    #[error("malformed category configuration: {0}")]
    Malformed(String),
}

/// Why a remote document could not be retrieved
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceFailure {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("remote returned HTTP {0}")]
    Status(u16),

    #[error("network failure: {0}")]
    Network(String),
}

/// Error taxonomy of the classification pipeline
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClassificationError {
    #[error("{field}: {reason}")]
    MissingFile { field: &'static str, reason: String },

    #[error("Unsupported file type '{mime_type}', allowed types: {}", .allowed.join(", "))]
    UnsupportedFileType {
        field: &'static str,
        mime_type: String,
        allowed: Vec<String>,
    },

    #[error("Could not retrieve document from {url}")]
    UnreachableSource { url: String, cause: SourceFailure },

    #[error("Could not determine the MIME type of {url}")]
    UnknownMimeType { url: String },

    #[error("Invalid category configuration: {source}")]
    InvalidCategoryConfig {
        field: &'static str,
        #[source]
        source: CategoryConfigError,
    },

    #[error("Document exceeds the maximum size of {limit} bytes")]
    DocumentTooLarge { field: &'static str, limit: usize },

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Classification failed: {0}")]
    AgentClassificationFailure(String),
}

impl ClassificationError {
    /// Machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            ClassificationError::MissingFile { .. } => "missing_file",
            ClassificationError::UnsupportedFileType { .. } => "unsupported_file_type",
            ClassificationError::UnreachableSource { .. } => "unreachable_source",
            ClassificationError::UnknownMimeType { .. } => "unknown_mime_type",
            ClassificationError::InvalidCategoryConfig { .. } => "invalid_category_config",
            ClassificationError::DocumentTooLarge { .. } => "document_too_large",
            ClassificationError::MalformedRequest(_) => "malformed_request",
            ClassificationError::AgentClassificationFailure(_) => "agent_classification_failure",
        }
    }

    /// Request field the error refers to, if any
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ClassificationError::MissingFile { field, .. }
            | ClassificationError::UnsupportedFileType { field, .. }
            | ClassificationError::InvalidCategoryConfig { field, .. }
            | ClassificationError::DocumentTooLarge { field, .. } => Some(*field),
            ClassificationError::UnreachableSource { .. }
            | ClassificationError::UnknownMimeType { .. } => Some("file_url"),
            ClassificationError::MalformedRequest(_)
            | ClassificationError::AgentClassificationFailure(_) => None,
        }
    }

    /// Whether the caller can fix the request and try again
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            ClassificationError::AgentClassificationFailure(_)
                | ClassificationError::UnreachableSource {
                    cause: SourceFailure::Network(_),
                    ..
                }
        )
    }

    pub fn invalid_categories(field: &'static str, source: CategoryConfigError) -> Self {
        ClassificationError::InvalidCategoryConfig { field, source }
    }
}
