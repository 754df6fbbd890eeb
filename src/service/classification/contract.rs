//! Runtime-built output contract for a classification request
//!
//! The category names differ on every request, so the shape the model must
//! answer with is built from data: a list of field descriptors interpreted by
//! a generic validator, and rendered as JSON Schema for the model's tool call.

use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::model::{
    CategoryDescriptor, ClassificationResult, Confidence, MAX_CATEGORIES, MIN_CATEGORIES,
};
use crate::service::classification::error::CategoryConfigError;
use crate::service::classification::validation::check_names;

pub const CATEGORY_FIELD: &str = "category";
pub const CONFIDENCE_FIELD: &str = "confidence";
pub const JUSTIFICATION_FIELD: &str = "justification";

const CONTRACT_DESCRIPTION: &str = "Classification response schema.";
const CONFIDENCE_DESCRIPTION: &str = "Confidence level of the classification.";
const JUSTIFICATION_DESCRIPTION: &str =
    "Brief explanation (2-3 sentences) of why this category was chosen.";

#[derive(Debug, Error)]
pub enum ContractError {
    #[error("Invalid contract configuration: {0}")]
    InvalidConfiguration(#[from] CategoryConfigError),
}

/// A value that does not satisfy the contract
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("missing required field '{0}'")]
    MissingField(String),

    #[error("field '{field}' must be one of [{}], got '{value}'", .allowed.join(", "))]
    NotInEnumeration {
        field: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("field '{field}' must be {expected}, got {actual}")]
    WrongType {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("unexpected field '{0}'")]
    UnexpectedField(String),
}

/// One legal value of an enumeration, with advisory text for the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumOption {
    pub value: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Closed set of string values
    Enumeration(Vec<EnumOption>),
    /// Free text
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub nullable: bool,
    /// Guidance surfaced to the model, never matched against
    pub description: String,
}

impl FieldDescriptor {
    fn check(&self, value: Option<&Value>) -> Result<(), ContractViolation> {
        let value = match value {
            None if self.required => {
                return Err(ContractViolation::MissingField(self.name.to_string()));
            }
            None => return Ok(()),
            Some(Value::Null) if self.nullable => return Ok(()),
            Some(value) => value,
        };

        let Some(text) = value.as_str() else {
            return Err(ContractViolation::WrongType {
                field: self.name.to_string(),
                expected: if self.nullable { "a string or null" } else { "a string" },
                actual: json_type_name(value),
            });
        };

        if let FieldKind::Enumeration(options) = &self.kind {
            if !options.iter().any(|o| o.value == text) {
                return Err(ContractViolation::NotInEnumeration {
                    field: self.name.to_string(),
                    value: text.to_string(),
                    allowed: options.iter().map(|o| o.value.clone()).collect(),
                });
            }
        }

        Ok(())
    }

    fn json_schema(&self) -> Value {
        let mut schema = Map::new();
        let type_value = if self.nullable {
            json!(["string", "null"])
        } else {
            json!("string")
        };
        schema.insert("type".to_string(), type_value);
        if let FieldKind::Enumeration(options) = &self.kind {
            let values: Vec<&str> = options.iter().map(|o| o.value.as_str()).collect();
            schema.insert("enum".to_string(), json!(values));
        }
        schema.insert("description".to_string(), json!(self.description));
        Value::Object(schema)
    }
}

/// The shape an acceptable classification answer must have
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationContract {
    fields: Vec<FieldDescriptor>,
}

/// Build the contract for one request
///
/// Fails with `InvalidConfiguration` on an empty set, an empty name or
/// duplicate names. The count upper bound is enforced by request validation.
pub fn build_contract(
    categories: &[CategoryDescriptor],
    confidence: bool,
    justification: bool,
) -> Result<ClassificationContract, ContractError> {
    if categories.is_empty() {
        return Err(CategoryConfigError::CountOutOfRange {
            count: 0,
            min: MIN_CATEGORIES,
            max: MAX_CATEGORIES,
        }
        .into());
    }
    check_names(categories)?;

    let mut fields = vec![category_field(categories)];

    if confidence {
        fields.push(FieldDescriptor {
            name: CONFIDENCE_FIELD,
            kind: FieldKind::Enumeration(
                Confidence::ALL
                    .iter()
                    .map(|c| EnumOption {
                        value: c.as_str().to_string(),
                        description: None,
                    })
                    .collect(),
            ),
            required: true,
            nullable: false,
            description: CONFIDENCE_DESCRIPTION.to_string(),
        });
    }

    if justification {
        fields.push(FieldDescriptor {
            name: JUSTIFICATION_FIELD,
            kind: FieldKind::Text,
            required: false,
            nullable: true,
            description: JUSTIFICATION_DESCRIPTION.to_string(),
        });
    }

    Ok(ClassificationContract { fields })
}

fn category_field(categories: &[CategoryDescriptor]) -> FieldDescriptor {
    let options: Vec<EnumOption> = categories
        .iter()
        .map(|c| EnumOption {
            value: c.name.clone(),
            description: Some(c.description.clone()),
        })
        .collect();

    let listing = options
        .iter()
        .map(|o| format!("- {}: {}", o.value, o.description.as_deref().unwrap_or_default()))
        .collect::<Vec<_>>()
        .join("\n");

    FieldDescriptor {
        name: CATEGORY_FIELD,
        kind: FieldKind::Enumeration(options),
        required: true,
        nullable: false,
        description: format!("The available categories are:\n{}", listing),
    }
}

impl ClassificationContract {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Legal values of the `category` field, in request order
    pub fn category_values(&self) -> Vec<&str> {
        match self.field(CATEGORY_FIELD).map(|f| &f.kind) {
            Some(FieldKind::Enumeration(options)) => {
                options.iter().map(|o| o.value.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }

    pub fn description(&self) -> &'static str {
        CONTRACT_DESCRIPTION
    }

    /// Render as a JSON Schema object
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.to_string(), f.json_schema()))
            .collect();

        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name)
            .collect();

        json!({
            "type": "object",
            "description": CONTRACT_DESCRIPTION,
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// Check a structured value against the contract and convert it
    pub fn validate(&self, value: &Value) -> Result<ClassificationResult, ContractViolation> {
        let object = value
            .as_object()
            .ok_or_else(|| ContractViolation::NotAnObject(json_type_name(value)))?;

        if let Some(key) = object.keys().find(|k| self.field(k).is_none()) {
            return Err(ContractViolation::UnexpectedField(key.clone()));
        }

        for field in &self.fields {
            field.check(object.get(field.name))?;
        }

        let text = |name: &str| object.get(name).and_then(Value::as_str);

        let category = text(CATEGORY_FIELD)
            .ok_or_else(|| ContractViolation::MissingField(CATEGORY_FIELD.to_string()))?
            .to_string();

        Ok(ClassificationResult {
            category,
            confidence: text(CONFIDENCE_FIELD).and_then(Confidence::parse),
            justification: text(JUSTIFICATION_FIELD).map(str::to_string),
        })
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn categories(names: &[&str]) -> Vec<CategoryDescriptor> {
        names
            .iter()
            .map(|n| CategoryDescriptor::new(*n, format!("Documents about {}", n)))
            .collect()
    }

    const NAMES: [&str; 10] = [
        "Finance", "Legal", "HR", "Sales", "Marketing", "IT", "Medical", "Insurance", "Tax",
        "Other",
    ];

    #[test]
    fn test_enumeration_equals_supplied_names_for_all_sizes() {
        for size in MIN_CATEGORIES..=MAX_CATEGORIES {
            let cats = categories(&NAMES[..size]);
            let contract = build_contract(&cats, false, false).unwrap();

            let enumerated: HashSet<&str> = contract.category_values().into_iter().collect();
            let supplied: HashSet<&str> = NAMES[..size].iter().copied().collect();
            assert_eq!(enumerated, supplied, "size {}", size);
            assert_eq!(contract.category_values().len(), size);
        }
    }

    #[test]
    fn test_duplicate_names_fail_fast() {
        let err = build_contract(&categories(&["HR", "HR"]), false, false).unwrap_err();
        let ContractError::InvalidConfiguration(source) = err;
        assert_eq!(source, CategoryConfigError::DuplicateNames(vec!["HR".to_string()]));
    }

    #[test]
    fn test_empty_set_fails_fast() {
        assert!(matches!(
            build_contract(&[], true, true),
            Err(ContractError::InvalidConfiguration(
                CategoryConfigError::CountOutOfRange { count: 0, .. }
            ))
        ));
    }

    #[test]
    fn test_confidence_field_presence() {
        let cats = categories(&["Finance", "Legal"]);

        let without = build_contract(&cats, false, false).unwrap();
        assert!(without.field(CONFIDENCE_FIELD).is_none());

        let with = build_contract(&cats, true, false).unwrap();
        let field = with.field(CONFIDENCE_FIELD).unwrap();
        assert!(field.required);
        assert!(!field.nullable);
        match &field.kind {
            FieldKind::Enumeration(options) => {
                let values: Vec<&str> = options.iter().map(|o| o.value.as_str()).collect();
                assert_eq!(values, vec!["high", "medium", "low"]);
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_justification_field_presence() {
        let cats = categories(&["Finance", "Legal"]);

        let without = build_contract(&cats, false, false).unwrap();
        assert!(without.field(JUSTIFICATION_FIELD).is_none());

        let with = build_contract(&cats, false, true).unwrap();
        let field = with.field(JUSTIFICATION_FIELD).unwrap();
        assert_eq!(field.kind, FieldKind::Text);
        assert!(!field.required);
        assert!(field.nullable);
    }

    #[test]
    fn test_descriptions_are_guidance_only() {
        let cats = vec![
            CategoryDescriptor::new("Finance", "Invoices, balance sheets"),
            CategoryDescriptor::new("Legal", "Contracts"),
        ];
        let contract = build_contract(&cats, false, false).unwrap();
        let field = contract.field(CATEGORY_FIELD).unwrap();
        assert!(field.description.contains("- Finance: Invoices, balance sheets"));
        assert!(field.description.contains("- Legal: Contracts"));

        // A description is never an accepted value
        assert!(contract
            .validate(&json!({"category": "Invoices, balance sheets"}))
            .is_err());
    }

    #[test]
    fn test_validate_accepts_conforming_value() {
        let contract =
            build_contract(&categories(&["Finance", "Legal"]), true, true).unwrap();
        let result = contract
            .validate(&json!({
                "category": "Finance",
                "confidence": "medium",
                "justification": "The document is an invoice."
            }))
            .unwrap();
        assert_eq!(result.category, "Finance");
        assert_eq!(result.confidence, Some(Confidence::Medium));
        assert_eq!(result.justification.as_deref(), Some("The document is an invoice."));
    }

    #[test]
    fn test_validate_justification_may_be_null_or_absent() {
        let contract = build_contract(&categories(&["Finance", "Legal"]), false, true).unwrap();
        let null = contract
            .validate(&json!({"category": "Legal", "justification": null}))
            .unwrap();
        assert_eq!(null.justification, None);
        let absent = contract.validate(&json!({"category": "Legal"})).unwrap();
        assert_eq!(absent.justification, None);
        assert_eq!(absent.confidence, None);
    }

    #[test]
    fn test_validate_rejects_missing_requested_confidence() {
        let contract = build_contract(&categories(&["Finance", "Legal"]), true, false).unwrap();
        assert_eq!(
            contract.validate(&json!({"category": "Finance"})),
            Err(ContractViolation::MissingField("confidence".to_string()))
        );
    }

    #[test]
    fn test_validate_rejects_unrequested_fields() {
        let contract = build_contract(&categories(&["Finance", "Legal"]), false, false).unwrap();
        assert_eq!(
            contract.validate(&json!({"category": "Finance", "confidence": "high"})),
            Err(ContractViolation::UnexpectedField("confidence".to_string()))
        );
        assert_eq!(
            contract.validate(&json!({"category": "Finance", "justification": "because"})),
            Err(ContractViolation::UnexpectedField("justification".to_string()))
        );
    }

    #[test]
    fn test_validate_rejects_values_outside_enumerations() {
        let contract = build_contract(&categories(&["Finance", "Legal"]), true, false).unwrap();
        assert!(matches!(
            contract.validate(&json!({"category": "Uncategorized", "confidence": "high"})),
            Err(ContractViolation::NotInEnumeration { .. })
        ));
        assert!(matches!(
            contract.validate(&json!({"category": "Finance", "confidence": "certain"})),
            Err(ContractViolation::NotInEnumeration { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_wrong_types() {
        let contract = build_contract(&categories(&["Finance", "Legal"]), false, true).unwrap();
        assert_eq!(
            contract.validate(&json!(["Finance"])),
            Err(ContractViolation::NotAnObject("array"))
        );
        assert!(matches!(
            contract.validate(&json!({"category": null})),
            Err(ContractViolation::WrongType { actual: "null", .. })
        ));
        assert!(matches!(
            contract.validate(&json!({"category": "Finance", "justification": 3})),
            Err(ContractViolation::WrongType { actual: "number", .. })
        ));
    }

    #[test]
    fn test_json_schema_shape() {
        let contract = build_contract(&categories(&["Finance", "Legal"]), true, true).unwrap();
        let schema = contract.to_json_schema();

        assert_eq!(schema["type"], "object");
        assert_eq!(schema["additionalProperties"], false);
        assert_eq!(schema["required"], json!(["category", "confidence"]));
        assert_eq!(
            schema["properties"]["category"]["enum"],
            json!(["Finance", "Legal"])
        );
        assert_eq!(
            schema["properties"]["confidence"]["enum"],
            json!(["high", "medium", "low"])
        );
        assert_eq!(
            schema["properties"]["justification"]["type"],
            json!(["string", "null"])
        );
    }

    #[test]
    fn test_json_schema_omits_unrequested_fields() {
        let contract = build_contract(&categories(&["Finance", "Legal"]), false, false).unwrap();
        let schema = contract.to_json_schema();
        let properties = schema["properties"].as_object().unwrap();
        assert_eq!(properties.len(), 1);
        assert!(properties.contains_key("category"));
    }
}
