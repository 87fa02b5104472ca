// Validation utilities for string fields

/// Trim an optional field, treating blank as absent
pub fn trim_optional_field(field: Option<&String>) -> Option<String> {
    field.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Require a present, non-blank field, naming it in the error
pub fn require_field(field: Option<&String>, name: &str) -> Result<String, String> {
    trim_optional_field(field).ok_or_else(|| format!("{} is required", name))
}
