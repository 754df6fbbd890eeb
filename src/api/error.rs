//! Unified API error handling
//!
//! Every failure leaves the service as the same JSON envelope, tagged with the
//! request id of the call that produced it.

use actix_web::{HttpResponse, ResponseError, http::StatusCode, web};
use serde::Serialize;
use serde_json::{Value, json};
use utoipa::ToSchema;

use crate::api::middleware::RequestContext;
use crate::service::classification::{CategoryConfigError, ClassificationError, SourceFailure};

/// Standard error response format
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error kind, e.g. `invalid_category_config`
    #[schema(example = "invalid_category_config")]
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Request field the error refers to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Structured details about the failure
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub details: Option<Value>,
    /// Request ID for tracing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Error returned by API handlers
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct ApiError {
    pub error: ClassificationError,
    pub request_id: Option<String>,
}

impl ApiError {
    pub fn new(error: ClassificationError, ctx: Option<&web::ReqData<RequestContext>>) -> Self {
        Self {
            error,
            request_id: ctx.map(|c| c.request_id.clone()),
        }
    }

    fn details(&self) -> Option<Value> {
        match &self.error {
            ClassificationError::UnsupportedFileType {
                mime_type, allowed, ..
            } => Some(json!({ "mime_type": mime_type, "allowed": allowed })),
            ClassificationError::UnreachableSource { url, cause } => {
                let cause = match cause {
                    SourceFailure::InvalidUrl(reason) => json!({ "invalid_url": reason }),
                    SourceFailure::Status(status) => json!({ "status": status }),
                    SourceFailure::Network(reason) => json!({ "network": reason }),
                };
                Some(json!({ "url": url, "cause": cause }))
            }
            ClassificationError::UnknownMimeType { url } => Some(json!({ "url": url })),
            ClassificationError::DocumentTooLarge { limit, .. } => {
                Some(json!({ "max_bytes": limit }))
            }
            ClassificationError::InvalidCategoryConfig { source, .. } => match source {
                CategoryConfigError::CountOutOfRange { count, min, max } => {
                    Some(json!({ "count": count, "min": min, "max": max }))
                }
                CategoryConfigError::EmptyName { index } => Some(json!({ "index": index })),
                CategoryConfigError::DuplicateNames(names) => Some(json!({ "duplicates": names })),
                CategoryConfigError::Malformed(_) => None,
            },
            _ => None,
        }
    }
}

impl From<ClassificationError> for ApiError {
    fn from(error: ClassificationError) -> Self {
        Self {
            error,
            request_id: None,
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.error {
            ClassificationError::MissingFile { .. }
            | ClassificationError::UnknownMimeType { .. }
            | ClassificationError::InvalidCategoryConfig { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ClassificationError::UnsupportedFileType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ClassificationError::DocumentTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ClassificationError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            ClassificationError::UnreachableSource { cause, .. } => match cause {
                SourceFailure::InvalidUrl(_) => StatusCode::BAD_REQUEST,
                SourceFailure::Status(status) if *status < 500 => StatusCode::BAD_REQUEST,
                SourceFailure::Status(_) | SourceFailure::Network(_) => StatusCode::BAD_GATEWAY,
            },
            ClassificationError::AgentClassificationFailure(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let kind = self.error.kind();

        if self.error.is_validation() {
            tracing::warn!(
                error_type = kind,
                status = status.as_u16(),
                message = %self,
                "Request rejected"
            );
        } else {
            tracing::error!(
                error_type = kind,
                status = status.as_u16(),
                message = %self,
                "API error"
            );
        }

        HttpResponse::build(status).json(ErrorResponse {
            error: kind.to_string(),
            message: self.to_string(),
            field: self.error.field().map(str::to_string),
            details: self.details(),
            request_id: self.request_id.clone(),
        })
    }
}
