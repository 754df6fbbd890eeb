use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Smallest category set a request may carry
pub const MIN_CATEGORIES: usize = 2;

/// Largest category set a request may carry
pub const MAX_CATEGORIES: usize = 10;

/// A caller-supplied category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CategoryDescriptor {
    /// The name of the category
    #[schema(example = "Finance")]
    pub name: String,
    /// A brief description of the category
    #[schema(example = "Documents related to financial matters.")]
    pub description: String,
}

impl CategoryDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Per-request classification settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ClassificationRequestConfig {
    /// Categories to choose from (2-10 entries, unique names)
    pub categories: Vec<CategoryDescriptor>,
    /// Whether to include a confidence level for the classification
    #[serde(default)]
    pub confidence: bool,
    /// Whether to include a justification for the chosen category
    #[serde(default)]
    pub justification: bool,
}

impl ClassificationRequestConfig {
    pub fn category_names(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Confidence level reported by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub const ALL: [Confidence; 3] = [Confidence::High, Confidence::Medium, Confidence::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == value)
    }
}

/// Document classification response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ClassificationResult {
    /// The chosen category for the document
    #[schema(example = "Finance")]
    pub category: String,
    /// Confidence level of the classification
    pub confidence: Option<Confidence>,
    /// Brief explanation (2-3 sentences) of why this category was chosen
    pub justification: Option<String>,
}
