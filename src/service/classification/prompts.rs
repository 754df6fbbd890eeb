//! Prompts for document classification

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::model::{ContentPart, DocumentPayload, Message};

/// Text cue preceding the document in the user message
pub const DOCUMENT_CUE: &str = "Here is the document to classify.";

/// System prompt for document classification
pub const SYSTEM_PROMPT: &str = r#"You are a document classification assistant. Your task is to analyze the content of a document and classify it into one of the categories provided by the user.

## Instructions
1. Carefully read the provided document
2. Analyze its content, context, and main characteristics
3. Compare it with the available categories
4. Choose the SINGLE most appropriate category
5. If none of the categories fit well or if the user has not provided any categories, choose "Uncategorized"

## Important Notes
- Don't include any personal data in your response.
- Only explain your reasoning when a justification is requested by the response schema.

Be precise and objective in your classification.

Your answer must be submitted through the provided tool and conform to its schema."#;

/// Build the messages carrying the document to the model
///
/// One user message: the text cue, then the base64-encoded file tagged with
/// its MIME type and sanitized filename.
pub fn build_messages(document: &DocumentPayload) -> Vec<Message> {
    vec![Message::user(vec![
        ContentPart::Text(DOCUMENT_CUE.to_string()),
        ContentPart::File {
            data_base64: STANDARD.encode(&document.bytes),
            mime_type: document.mime_type.clone(),
            filename: document.filename.clone(),
        },
    ])]
}
