use thiserror::Error;

pub type Result<T> = std::result::Result<T, SatchelError>;

#[derive(Debug, Error)]
pub enum SatchelError {
    /// The CSV input is structurally unusable (empty file, header row out of
    /// range). Aborts the whole import before any row-level processing.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The ZIP archive is unusable (unreadable, or no transactions.csv member).
    #[error("ZIP error: {0}")]
    Zip(String),

    #[error("Unknown organization: {0}")]
    UnknownOrganization(String),

    #[error("Unknown import template: {0}")]
    UnknownTemplate(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}
