pub mod agent;
pub mod classification;
pub mod document;
pub mod llm;

pub use classification::ClassificationService;
pub use document::DocumentLoader;
pub use llm::LlmClient;
