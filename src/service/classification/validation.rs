//! Request-level validation of category sets
//!
//! Runs before any document is loaded or any model call is made.

use std::collections::HashSet;

use crate::model::{CategoryDescriptor, MAX_CATEGORIES, MIN_CATEGORIES};
use crate::service::classification::error::CategoryConfigError;

/// Validate a caller-supplied category set
///
/// Checks, in order:
/// 1. Between 2 and 10 categories
/// 2. No empty names
/// 3. No duplicate names (case-sensitive)
pub fn validate_categories(categories: &[CategoryDescriptor]) -> Result<(), CategoryConfigError> {
    let count = categories.len();
    if !(MIN_CATEGORIES..=MAX_CATEGORIES).contains(&count) {
        return Err(CategoryConfigError::CountOutOfRange {
            count,
            min: MIN_CATEGORIES,
            max: MAX_CATEGORIES,
        });
    }

    check_names(categories)
}

/// Name checks shared with the contract builder
pub(crate) fn check_names(categories: &[CategoryDescriptor]) -> Result<(), CategoryConfigError> {
    if let Some(index) = categories.iter().position(|c| c.name.trim().is_empty()) {
        return Err(CategoryConfigError::EmptyName { index });
    }

    let duplicates = find_duplicates(categories);
    if !duplicates.is_empty() {
        return Err(CategoryConfigError::DuplicateNames(duplicates));
    }

    Ok(())
}

/// Names appearing more than once, each reported once in first-seen order
fn find_duplicates(categories: &[CategoryDescriptor]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    let mut duplicates = Vec::new();

    for category in categories {
        let name = category.name.as_str();
        if !seen.insert(name) && reported.insert(name) {
            duplicates.push(name.to_string());
        }
    }

    duplicates
}
