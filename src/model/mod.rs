pub mod classification;
pub mod config;
pub mod document;
pub mod message;

pub use classification::{
    CategoryDescriptor, ClassificationRequestConfig, ClassificationResult, Confidence,
    MAX_CATEGORIES, MIN_CATEGORIES,
};
pub use config::{Config, DocumentPolicy, LlmConfig};
pub use document::{DocumentPayload, DocumentSource};
pub use message::{ContentPart, Message};
