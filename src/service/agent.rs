//! Boundary to the hosted classification agent

use async_trait::async_trait;
use serde_json::Value;

use crate::model::Message;
use crate::service::classification::contract::{ClassificationContract, ContractViolation};

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Completion request failed: {0}")]
    Completion(#[from] rig::completion::CompletionError),

    #[error("Completion request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Invalid agent input or output: {0}")]
    ParseError(String),

    #[error("Model answered without calling the classification tool")]
    NoToolCall,

    #[error("No conforming output after {attempts} attempt(s): {violation}")]
    NonConforming {
        attempts: usize,
        violation: ContractViolation,
    },
}

/// A hosted LLM agent that answers with structured data
///
/// Implementations must either return a value conforming to `contract` or fail;
/// how they enforce it (tool calling, constrained decoding) is their concern.
#[async_trait]
pub trait ClassificationAgent: Send + Sync {
    async fn invoke(
        &self,
        system_instruction: &str,
        messages: &[Message],
        contract: &ClassificationContract,
    ) -> Result<Value, AgentError>;
}
