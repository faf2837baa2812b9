//! Error types for custom fields

use thiserror::Error;

/// Result type for custom field operations
pub type Result<T> = std::result::Result<T, FieldsError>;

/// Errors that can occur in custom field operations.
///
/// Category reads and writes never produce these: an unknown name on write
/// or an unknown id on read resolve to `None`/no-op instead.
#[derive(Debug, Error)]
pub enum FieldsError {
    /// Field not found by accessor name
    #[error("field not found: {name}")]
    FieldNotFound { name: String },

    /// Another field already holds this accessor name
    #[error("duplicate field name: {name}")]
    DuplicateFieldName { name: String },

    /// Field not found by ULID
    #[error("field not found by id: {id}")]
    FieldNotFoundById { id: String },

    /// Entity template not found
    #[error("entity template not found: {name}")]
    EntityNotFound { name: String },

    /// Field kind string did not match any known kind
    #[error("unknown field kind: {kind}")]
    UnknownFieldKind { kind: String },

    /// Record source has no enumerator with this name
    #[error("unknown record scope: {scope}")]
    UnknownScope { scope: String },

    /// Field definition failed validation
    #[error("validation error on field '{field}': {message}")]
    ValidationFailed { field: String, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FieldsError::FieldNotFound {
            name: "global_category".into(),
        };
        assert_eq!(err.to_string(), "field not found: global_category");
    }

    #[test]
    fn test_duplicate_field_name_display() {
        let err = FieldsError::DuplicateFieldName {
            name: "global_category".into(),
        };
        assert_eq!(err.to_string(), "duplicate field name: global_category");
    }

    #[test]
    fn test_validation_error() {
        let err = FieldsError::ValidationFailed {
            field: "global_category".into(),
            message: "category item name cannot be empty".into(),
        };
        assert!(err.to_string().contains("global_category"));
        assert!(err.to_string().contains("cannot be empty"));
    }

    #[test]
    fn test_unknown_scope_names_the_scope() {
        let err = FieldsError::UnknownScope {
            scope: "ordered".into(),
        };
        assert_eq!(err.to_string(), "unknown record scope: ordered");
    }
}
