/// Failure kinds surfaced by the task store.
///
/// Validation variants are raised before any statement runs. `Storage`
/// means the surrounding savepoint was rolled back and nothing changed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("task name must not be empty")]
    EmptyName,
    #[error("invalid date '{input}': expected YYYY-MM-DD")]
    InvalidDate { input: String },
    #[error("invalid range: end {end} is before start {start}")]
    InvalidRange { start: String, end: String },
    #[error("invalid status '{0}': must be NEW, IN_PROGRESS, COMPLETED, or ARCHIVED")]
    InvalidStatus(String),
    #[error("invalid category '{0}': must be Work or Personal")]
    InvalidCategory(String),
    #[error("parent task {0} not found")]
    ParentNotFound(i64),
    #[error("stored timestamp '{value}' is not in YYYY-MM-DD HH:MM:SS format")]
    Timestamp { value: String },
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
