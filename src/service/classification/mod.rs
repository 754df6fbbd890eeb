//! Document classification service using a hosted LLM agent
//!
//! Builds a per-request output contract from the caller's categories, hands the
//! document and the contract to the agent and returns the conforming answer.

use std::sync::Arc;

use crate::model::{ClassificationRequestConfig, ClassificationResult, DocumentPayload};
use crate::service::agent::ClassificationAgent;

pub mod contract;
pub mod error;
pub mod prompts;
pub mod validation;

pub use contract::{ClassificationContract, ContractError, build_contract};
pub use error::{CategoryConfigError, ClassificationError, SourceFailure};
pub use prompts::{SYSTEM_PROMPT, build_messages};
pub use validation::validate_categories;

const CATEGORIES_FIELD: &str = "categories";

/// Service classifying documents into caller-supplied categories
pub struct ClassificationService {
    agent: Arc<dyn ClassificationAgent>,
}

impl ClassificationService {
    pub fn new(agent: Arc<dyn ClassificationAgent>) -> Self {
        Self { agent }
    }

    /// Reject a category configuration before any work is done
    pub fn validate(&self, config: &ClassificationRequestConfig) -> Result<(), ClassificationError> {
        validate_categories(&config.categories)
            .map_err(|e| ClassificationError::invalid_categories(CATEGORIES_FIELD, e))
    }

    /// Classify a document with the given configuration
    pub async fn classify(
        &self,
        document: &DocumentPayload,
        config: &ClassificationRequestConfig,
    ) -> Result<ClassificationResult, ClassificationError> {
        self.validate(config)?;

        let contract = build_contract(&config.categories, config.confidence, config.justification)
            .map_err(|ContractError::InvalidConfiguration(e)| {
                ClassificationError::invalid_categories(CATEGORIES_FIELD, e)
            })?;

        self.invoke(document, &contract, SYSTEM_PROMPT).await
    }

    /// Run one agent invocation constrained by `contract`
    pub async fn invoke(
        &self,
        document: &DocumentPayload,
        contract: &ClassificationContract,
        system_instruction: &str,
    ) -> Result<ClassificationResult, ClassificationError> {
        let start_time = std::time::Instant::now();
        let messages = build_messages(document);
        let categories = contract.category_values();

        tracing::debug!(
            categories = ?categories,
            filename = %document.filename,
            mime_type = %document.mime_type,
            size = document.size(),
            "Invoking classification agent"
        );

        let value = match self
            .agent
            .invoke(system_instruction, &messages, contract)
            .await
        {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(
                    categories = ?categories,
                    filename = %document.filename,
                    mime_type = %document.mime_type,
                    size = document.size(),
                    elapsed_ms = start_time.elapsed().as_millis(),
                    error = %e,
                    "Classification agent failed"
                );
                return Err(ClassificationError::AgentClassificationFailure(
                    "The document could not be classified".to_string(),
                ));
            }
        };

        let result = contract.validate(&value).map_err(|violation| {
            tracing::error!(
                categories = ?categories,
                filename = %document.filename,
                mime_type = %document.mime_type,
                size = document.size(),
                violation = %violation,
                "Classification agent returned non-conforming output"
            );
            ClassificationError::AgentClassificationFailure(
                "The document could not be classified".to_string(),
            )
        })?;

        tracing::info!(
            category = %result.category,
            confidence = ?result.confidence,
            elapsed_ms = start_time.elapsed().as_millis(),
            "Document classified"
        );

        Ok(result)
    }
}
