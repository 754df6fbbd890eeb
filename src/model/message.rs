//! Provider-neutral chat messages handed to the classification agent

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
}

/// One part of a multimodal message
#[derive(Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    File {
        /// Base64 (standard alphabet, padded) file content
        data_base64: String,
        mime_type: String,
        filename: String,
    },
}

impl fmt::Debug for ContentPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentPart::Text(text) => f.debug_tuple("Text").field(text).finish(),
            ContentPart::File {
                data_base64,
                mime_type,
                filename,
            } => f
                .debug_struct("File")
                .field("filename", filename)
                .field("mime_type", mime_type)
                .field("encoded_len", &data_base64.len())
                .finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentPart>,
}

impl Message {
    pub fn user(content: Vec<ContentPart>) -> Self {
        Self {
            role: Role::User,
            content,
        }
    }
}
