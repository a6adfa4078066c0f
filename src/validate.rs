use crate::error::{Error, Result};

/// Validate a task name and return it trimmed. Whitespace-only names are empty.
pub fn validate_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::EmptyName);
    }
    Ok(trimmed)
}

/// Normalize an optional free-text due date: blank input means no due date.
pub fn normalize_due_date(due_date: Option<&str>) -> Option<String> {
    due_date
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}
