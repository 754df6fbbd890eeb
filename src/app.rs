//! Application state and service initialization
//!
//! Builds the service graph once at startup so handlers only receive shared,
//! read-only dependencies.

use std::sync::Arc;

use crate::model::Config;
use crate::service::{ClassificationService, DocumentLoader, LlmClient};

/// Application state containing all services and shared resources
pub struct AppState {
    /// Classification pipeline backed by the hosted model
    pub classification_service: ClassificationService,
    /// Upload validation and remote document retrieval
    pub document_loader: DocumentLoader,
}

impl AppState {
    /// Initialize all services and build application state
    ///
    /// Fails when `OPENAI_API_KEY` is missing or the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(AppError::MissingConfig("OPENAI_API_KEY"))?;

        let llm_client = LlmClient::new(&api_key, &config.llm).map_err(AppError::InvalidConfig)?;

        tracing::info!(
            model = %llm_client.model(),
            max_attempts = config.llm.max_attempts,
            "LLM client initialized"
        );

        tracing::info!(
            upload_mime_types = ?config.documents.upload_mime_types,
            remote_mime_types = ?config.documents.remote_mime_types,
            max_document_bytes = config.documents.max_document_bytes,
            "Document policy loaded"
        );

        let document_loader =
            DocumentLoader::new(config.documents.clone()).map_err(AppError::InvalidConfig)?;

        Ok(Self {
            classification_service: ClassificationService::new(Arc::new(llm_client)),
            document_loader,
        })
    }
}

/// Application-level errors
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AppError {
    /// Missing required configuration
    #[error("Missing required configuration: {0}")]
    MissingConfig(&'static str),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
