//! Category model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default display color for categories created without one
pub const DEFAULT_CATEGORY_COLOR: &str = "#808080";

/// Category entity.
///
/// Posts reference categories by name, so the name is unique and a category
/// with posts cannot be deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    /// Unique identifier (opaque string)
    pub id: String,
    /// Category name (unique)
    pub name: String,
    /// Description shown to readers
    pub description: String,
    /// Display color (hex)
    pub color: String,
}

impl Category {
    /// Create a new category
    pub fn new(name: String, description: String, color: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            description,
            color: color.unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_string()),
        }
    }
}

/// Input for creating a category
#[derive(Debug, Clone)]
pub struct CreateCategoryInput {
    /// Category name (required, unique)
    pub name: String,
    /// Description (required)
    pub description: String,
    /// Display color (optional, defaults to grey)
    pub color: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_new_default_color() {
        let category = Category::new("Health".to_string(), "Wellbeing".to_string(), None);
        assert_eq!(category.color, DEFAULT_CATEGORY_COLOR);
        assert!(!category.id.is_empty());
    }

    #[test]
    fn test_category_new_custom_color() {
        let category = Category::new(
            "Health".to_string(),
            "Wellbeing".to_string(),
            Some("#336699".to_string()),
        );
        assert_eq!(category.color, "#336699");
    }
}
