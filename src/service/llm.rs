//! Shared LLM client and classification agent
//!
//! Wraps rig's OpenAI client. Each invocation builds a rig agent whose only tool
//! is `submit_classification`, declared with the request's contract as its
//! parameter schema, and requires the model to call it.

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rig::OneOrMany;
use rig::client::CompletionClient;
use rig::completion::{Completion, ToolDefinition};
use rig::message::{AssistantContent, DocumentMediaType, Message as RigMessage, UserContent};
use rig::providers::openai;
use rig::tool::Tool;
use serde_json::{Value, json};

use crate::model::config::{MIME_PDF, MIME_TEXT};
use crate::model::{ContentPart, LlmConfig, Message};
use crate::service::agent::{AgentError, ClassificationAgent};
use crate::service::classification::contract::{ClassificationContract, ContractViolation};

/// Name of the tool the model must call with its answer
pub const CLASSIFICATION_TOOL: &str = "submit_classification";

/// Shared LLM client wrapper
#[derive(Clone)]
pub struct LlmClient {
    client: openai::Client,
    model: String,
    max_attempts: usize,
    timeout: Duration,
}

impl LlmClient {
    /// Create a new LLM client with the provided API key
    pub fn new(api_key: &str, config: &LlmConfig) -> Result<Self, String> {
        let client = openai::Client::new(api_key)
            .map_err(|e| format!("Failed to create OpenAI client: {}", e))?;

        Ok(Self {
            client,
            model: config.model_id.clone(),
            max_attempts: config.max_attempts.max(1),
            timeout: config.timeout,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// The single tool offered to the model; its parameters are the contract schema
#[derive(Clone)]
struct SubmitClassification {
    contract: ClassificationContract,
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct RejectedArguments(ContractViolation);

impl Tool for SubmitClassification {
    const NAME: &'static str = CLASSIFICATION_TOOL;

    type Error = RejectedArguments;
    type Args = Value;
    type Output = Value;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: CLASSIFICATION_TOOL.to_string(),
            description: self.contract.description().to_string(),
            parameters: self.contract.to_json_schema(),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        self.contract.validate(&args).map_err(RejectedArguments)?;
        Ok(args)
    }
}

fn media_type(mime_type: &str) -> Option<DocumentMediaType> {
    match mime_type {
        MIME_PDF => Some(DocumentMediaType::PDF),
        MIME_TEXT => Some(DocumentMediaType::TXT),
        _ => None,
    }
}

fn rig_message(message: &Message) -> Result<RigMessage, AgentError> {
    let parts = message.content.iter().map(|part| match part {
        ContentPart::Text(text) => UserContent::text(text.clone()),
        ContentPart::File {
            data_base64,
            mime_type,
            ..
        } => UserContent::document(data_base64.clone(), media_type(mime_type)),
    });

    let content = OneOrMany::many(parts)
        .map_err(|_| AgentError::ParseError("Message has no content".to_string()))?;

    Ok(RigMessage::User { content })
}

/// Arguments of the classification tool call in a model reply, if any
fn tool_arguments(choice: &OneOrMany<AssistantContent>) -> Option<Value> {
    choice.iter().find_map(|content| match content {
        AssistantContent::ToolCall(call) if call.function.name == CLASSIFICATION_TOOL => {
            Some(call.function.arguments.clone())
        }
        _ => None,
    })
}

/// Arguments may arrive as a JSON object or as a JSON-encoded string
fn parse_arguments(
    arguments: Value,
    contract: &ClassificationContract,
) -> Result<Value, ContractViolation> {
    let value = match arguments {
        Value::String(raw) => serde_json::from_str(&raw)
            .map_err(|e| ContractViolation::InvalidJson(e.to_string()))?,
        other => other,
    };
    contract.validate(&value)?;
    Ok(value)
}

/// Ask the model until it submits conforming arguments or attempts run out
///
/// `send` performs one round trip given the prompt and the preceding history.
/// A non-conforming answer is echoed back with the violation so the model can
/// correct itself.
async fn submit_with_feedback<F, Fut>(
    prompt: RigMessage,
    contract: &ClassificationContract,
    max_attempts: usize,
    mut send: F,
) -> Result<Value, AgentError>
where
    F: FnMut(RigMessage, Vec<RigMessage>) -> Fut,
    Fut: Future<Output = Result<OneOrMany<AssistantContent>, AgentError>>,
{
    let mut history = Vec::new();
    let mut prompt = prompt;
    let mut attempt = 0;

    loop {
        attempt += 1;

        let choice = send(prompt.clone(), history.clone()).await?;
        let arguments = tool_arguments(&choice).ok_or(AgentError::NoToolCall)?;

        let violation = match parse_arguments(arguments.clone(), contract) {
            Ok(value) => return Ok(value),
            Err(violation) => violation,
        };

        tracing::warn!(
            attempt = attempt,
            max_attempts = max_attempts,
            violation = %violation,
            "Classification tool call did not conform to the contract"
        );

        if attempt >= max_attempts {
            return Err(AgentError::NonConforming {
                attempts: attempt,
                violation,
            });
        }

        history.push(prompt);
        history.push(RigMessage::assistant(arguments.to_string()));
        prompt = RigMessage::user(format!(
            "Invalid arguments for {}: {}. Call {} again with arguments that conform to its schema.",
            CLASSIFICATION_TOOL, violation, CLASSIFICATION_TOOL
        ));
    }
}

#[async_trait]
impl ClassificationAgent for LlmClient {
    async fn invoke(
        &self,
        system_instruction: &str,
        messages: &[Message],
        contract: &ClassificationContract,
    ) -> Result<Value, AgentError> {
        let mut converted = messages
            .iter()
            .map(rig_message)
            .collect::<Result<Vec<_>, _>>()?;
        let prompt = converted
            .pop()
            .ok_or_else(|| AgentError::ParseError("No message to send".to_string()))?;

        let agent = self
            .client
            .agent(&self.model)
            .preamble(system_instruction)
            .tool(SubmitClassification {
                contract: contract.clone(),
            })
            .additional_params(json!({ "tool_choice": "required" }))
            .build();

        let send = |prompt: RigMessage, history: Vec<RigMessage>| {
            let agent = &agent;
            let context = converted.clone();
            async move {
                let start_time = Instant::now();
                let mut chat_history = context;
                chat_history.extend(history);

                let request = async {
                    agent.completion(prompt, chat_history).await?.send().await
                };

                let response = match tokio::time::timeout(self.timeout, request).await {
                    Ok(Ok(response)) => response,
                    Ok(Err(e)) => {
                        tracing::error!(
                            model = %self.model,
                            elapsed_ms = start_time.elapsed().as_millis(),
                            error = %e,
                            "LLM call for document classification failed"
                        );
                        return Err(AgentError::Completion(e));
                    }
                    Err(_) => {
                        tracing::error!(
                            model = %self.model,
                            elapsed_ms = start_time.elapsed().as_millis(),
                            "LLM call for document classification timed out"
                        );
                        return Err(AgentError::Timeout(self.timeout));
                    }
                };

                tracing::info!(
                    model = %self.model,
                    elapsed_ms = start_time.elapsed().as_millis(),
                    "LLM call for document classification completed"
                );

                Ok(response.choice)
            }
        };

        submit_with_feedback(prompt, contract, self.max_attempts, send).await
    }
}
