//! OpenAPI specification endpoints

use actix_web::{HttpResponse, Responder, get};
use utoipa::OpenApi;

use crate::api::error::ErrorResponse;
use crate::api::health::HealthStatus;
use crate::api::invocations::{InvocationForm, UrlInvocationRequest};
use crate::model::{CategoryDescriptor, ClassificationRequestConfig, ClassificationResult, Confidence};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Document Classification Agent",
        description = "Classifies documents into caller-supplied categories using a hosted LLM"
    ),
    paths(
        crate::api::invocations::invoke_upload,
        crate::api::health::ping,
    ),
    components(schemas(
        InvocationForm,
        UrlInvocationRequest,
        ClassificationRequestConfig,
        CategoryDescriptor,
        ClassificationResult,
        Confidence,
        ErrorResponse,
        HealthStatus,
    )),
    tags(
        (name = "classification", description = "Document classification"),
        (name = "health", description = "Liveness check")
    )
)]
pub struct ApiDoc;

/// Serve OpenAPI JSON specification
#[get("/openapi.json")]
pub async fn openapi_json() -> impl Responder {
    HttpResponse::Ok().json(ApiDoc::openapi())
}

/// Serve OpenAPI YAML specification
#[get("/openapi.yaml")]
pub async fn openapi_yaml() -> impl Responder {
    match ApiDoc::openapi().to_yaml() {
        Ok(yaml) => HttpResponse::Ok().content_type("text/yaml").body(yaml),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render OpenAPI YAML");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Configure OpenAPI routes
pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(openapi_json).service(openapi_yaml);
}
