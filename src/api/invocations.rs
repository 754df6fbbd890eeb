//! Classification endpoint
//!
//! `POST /invocations` accepts either a multipart upload (`file` + `config`) or a
//! JSON body pointing at a remote document (`file_url` + categories).

use actix_multipart::{Field, Multipart};
use actix_web::guard::GuardContext;
use actix_web::http::header;
use actix_web::{HttpResponse, post, web};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::api::error::{ApiError, ErrorResponse};
use crate::api::middleware::RequestContext;
use crate::model::{
    CategoryDescriptor, ClassificationRequestConfig, ClassificationResult, DocumentSource,
};
use crate::service::classification::{CategoryConfigError, ClassificationError};
use crate::service::document::{UPLOAD_FIELD, URL_FIELD};
use crate::service::{ClassificationService, DocumentLoader};

/// Upper bound for the non-file form fields
const TEXT_FIELD_LIMIT: usize = 64 * 1024;

/// Multipart form accepted by `POST /invocations`
///
/// Either `config` carries the whole classification configuration as JSON, or
/// `categories`, `confidence` and `justification` are sent as separate fields.
#[derive(Debug, Default, ToSchema)]
pub struct InvocationForm {
    /// The document to classify
    #[schema(value_type = Option<String>, format = Binary)]
    pub file: Option<DocumentSource>,
    /// JSON-encoded `{categories, confidence, justification}`
    #[schema(example = r#"{"confidence": true, "justification": false, "categories": [{"name": "Finance", "description": "Financial documents"}, {"name": "Legal", "description": "Contracts and agreements"}]}"#)]
    pub config: Option<String>,
    /// JSON-encoded category list, used when `config` is absent
    pub categories: Option<String>,
    /// `true`/`false`, used when `config` is absent
    pub confidence: Option<String>,
    /// `true`/`false`, used when `config` is absent
    pub justification: Option<String>,
}

impl InvocationForm {
    /// Read every part of a multipart payload
    async fn read(mut payload: Multipart, max_file_bytes: usize) -> Result<Self, ClassificationError> {
        let mut form = Self::default();

        while let Some(item) = payload.next().await {
            let mut field = item.map_err(|e| ClassificationError::MalformedRequest(e.to_string()))?;
            let name = field.name().unwrap_or_default().to_string();

            match name.as_str() {
                UPLOAD_FIELD => {
                    let filename = field
                        .content_disposition()
                        .and_then(|cd| cd.get_filename())
                        .map(str::to_string);
                    let content_type = field.content_type().map(|m| m.to_string());
                    let bytes = read_limited(&mut field, max_file_bytes).await?.ok_or(
                        ClassificationError::DocumentTooLarge {
                            field: UPLOAD_FIELD,
                            limit: max_file_bytes,
                        },
                    )?;

                    form.file = Some(DocumentSource::Upload {
                        filename,
                        content_type,
                        bytes,
                    });
                }
                "config" => form.config = Some(read_text(&mut field, "config").await?),
                "categories" => form.categories = Some(read_text(&mut field, "categories").await?),
                "confidence" => form.confidence = Some(read_text(&mut field, "confidence").await?),
                "justification" => {
                    form.justification = Some(read_text(&mut field, "justification").await?)
                }
                other => {
                    tracing::debug!(field = other, "Ignoring unknown form field");
                    while let Some(chunk) = field.next().await {
                        chunk.map_err(|e| ClassificationError::MalformedRequest(e.to_string()))?;
                    }
                }
            }
        }

        Ok(form)
    }

    /// Resolve the classification configuration carried by the form
    fn request_config(&self) -> Result<ClassificationRequestConfig, ClassificationError> {
        if let Some(config) = &self.config {
            return serde_json::from_str(config).map_err(|e| {
                ClassificationError::invalid_categories(
                    "config",
                    CategoryConfigError::Malformed(e.to_string()),
                )
            });
        }

        let categories = match &self.categories {
            Some(raw) => serde_json::from_str::<Vec<CategoryDescriptor>>(raw).map_err(|e| {
                ClassificationError::invalid_categories(
                    "categories",
                    CategoryConfigError::Malformed(e.to_string()),
                )
            })?,
            None => Vec::new(),
        };

        Ok(ClassificationRequestConfig {
            categories,
            confidence: parse_flag("confidence", self.confidence.as_deref())?,
            justification: parse_flag("justification", self.justification.as_deref())?,
        })
    }
}

/// JSON body accepted by `POST /invocations` for remote documents
#[derive(Debug, Deserialize, ToSchema)]
pub struct UrlInvocationRequest {
    /// HTTP(S) URL of the document to classify
    #[schema(example = "https://example.com/reports/q3.pdf")]
    pub file_url: Option<String>,
    /// Categories to choose from (2-10 entries, unique names)
    #[serde(default)]
    pub categories: Vec<CategoryDescriptor>,
    /// Whether to include a confidence level for the classification
    #[serde(default)]
    pub confidence: bool,
    /// Whether to include a justification for the chosen category
    #[serde(default)]
    pub justification: bool,
}

impl UrlInvocationRequest {
    fn parse(body: &[u8]) -> Result<Self, ClassificationError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| ClassificationError::MalformedRequest(e.to_string()))?;

        let object = value.as_object().ok_or_else(|| {
            ClassificationError::MalformedRequest("expected a JSON object".to_string())
        })?;

        match object.get(URL_FIELD) {
            None | Some(Value::Null) | Some(Value::String(_)) => {}
            Some(_) => {
                return Err(ClassificationError::MalformedRequest(format!(
                    "{} must be a string",
                    URL_FIELD
                )));
            }
        }

        serde_json::from_value(value).map_err(|e| {
            ClassificationError::invalid_categories(
                "categories",
                CategoryConfigError::Malformed(e.to_string()),
            )
        })
    }
}

pub fn is_multipart(ctx: &GuardContext) -> bool {
    ctx.head()
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false)
}

/// Classify a document
///
/// Send the document either as a multipart upload (`file` plus `config`) or as a
/// JSON body with a `file_url` the service downloads. The answer only ever names
/// one of the supplied categories.
#[utoipa::path(
    post,
    path = "/invocations",
    request_body(
        content(
            (InvocationForm = "multipart/form-data"),
            (UrlInvocationRequest = "application/json")
        ),
        description = "Document and classification configuration"
    ),
    responses(
        (status = 200, description = "Document classified", body = ClassificationResult),
        (status = 400, description = "Malformed request or unreachable document URL", body = ErrorResponse),
        (status = 413, description = "Document exceeds the size limit", body = ErrorResponse),
        (status = 415, description = "Document type is not supported", body = ErrorResponse),
        (status = 422, description = "Missing document or invalid category configuration", body = ErrorResponse),
        (status = 502, description = "Document source or classification agent failed", body = ErrorResponse)
    ),
    params(
        ("X-Request-ID" = Option<String>, Header, description = "Request ID echoed on the response"),
        ("X-User-ID" = Option<String>, Header, description = "Caller identity for log correlation")
    ),
    tag = "classification"
)]
#[post("/invocations", guard = "is_multipart")]
pub async fn invoke_upload(
    service: web::Data<ClassificationService>,
    loader: web::Data<DocumentLoader>,
    ctx: Option<web::ReqData<RequestContext>>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let result = classify_upload(&service, &loader, payload)
        .await
        .map_err(|e| ApiError::new(e, ctx.as_ref()))?;

    Ok(HttpResponse::Ok().json(result))
}

/// Classify a remote document referenced by URL
#[post("/invocations")]
pub async fn invoke_url(
    service: web::Data<ClassificationService>,
    loader: web::Data<DocumentLoader>,
    ctx: Option<web::ReqData<RequestContext>>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let result = classify_url(&service, &loader, &body)
        .await
        .map_err(|e| ApiError::new(e, ctx.as_ref()))?;

    Ok(HttpResponse::Ok().json(result))
}

async fn classify_upload(
    service: &ClassificationService,
    loader: &DocumentLoader,
    payload: Multipart,
) -> Result<ClassificationResult, ClassificationError> {
    let form = InvocationForm::read(payload, loader.policy().max_document_bytes).await?;
    let config = form.request_config()?;
    service.validate(&config)?;

    let source = form.file.ok_or_else(|| ClassificationError::MissingFile {
        field: UPLOAD_FIELD,
        reason: "Field required".to_string(),
    })?;
    classify(service, loader, source, &config).await
}

async fn classify_url(
    service: &ClassificationService,
    loader: &DocumentLoader,
    body: &[u8],
) -> Result<ClassificationResult, ClassificationError> {
    let request = UrlInvocationRequest::parse(body)?;
    let config = ClassificationRequestConfig {
        categories: request.categories,
        confidence: request.confidence,
        justification: request.justification,
    };
    service.validate(&config)?;

    let url = request
        .file_url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ClassificationError::MissingFile {
            field: URL_FIELD,
            reason: "Field required".to_string(),
        })?;
    classify(service, loader, DocumentSource::Remote { url }, &config).await
}

async fn classify(
    service: &ClassificationService,
    loader: &DocumentLoader,
    source: DocumentSource,
    config: &ClassificationRequestConfig,
) -> Result<ClassificationResult, ClassificationError> {
    tracing::info!(
        categories = ?config.category_names(),
        confidence = config.confidence,
        justification = config.justification,
        source = ?source,
        "Classification requested"
    );

    let document = loader.load(source).await?;
    service.classify(&document, config).await
}

async fn read_limited(
    field: &mut Field,
    limit: usize,
) -> Result<Option<Vec<u8>>, ClassificationError> {
    let mut buf = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| ClassificationError::MalformedRequest(e.to_string()))?;
        if buf.len() + chunk.len() > limit {
            return Ok(None);
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(Some(buf))
}

async fn read_text(field: &mut Field, name: &str) -> Result<String, ClassificationError> {
    let bytes = read_limited(field, TEXT_FIELD_LIMIT).await?.ok_or_else(|| {
        ClassificationError::MalformedRequest(format!("form field '{}' is too large", name))
    })?;
    String::from_utf8(bytes).map_err(|_| {
        ClassificationError::MalformedRequest(format!("form field '{}' is not valid UTF-8", name))
    })
}

fn parse_flag(field: &'static str, value: Option<&str>) -> Result<bool, ClassificationError> {
    let Some(value) = value else {
        return Ok(false);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "false" | "0" | "off" | "no" => Ok(false),
        "true" | "1" | "on" | "yes" => Ok(true),
        other => Err(ClassificationError::invalid_categories(
            field,
            CategoryConfigError::Malformed(format!("'{}' is not a boolean", other)),
        )),
    }
}

/// Configure classification routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(invoke_upload).service(invoke_url);
}
