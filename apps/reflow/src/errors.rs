use thiserror::Error;

/// Errors that abort a run.
///
/// Everything here is raised during setup, before the document is touched, or while
/// reading/writing snapshot files. Per-frame, per-paragraph and per-run problems
/// during the passes are never errors; they are counted in the run report.
#[derive(Debug, Error)]
pub enum ReflowError {
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Required paragraph style missing: {0}")]
    StyleMissing(String),

    #[error("Document has no pages to place text on")]
    NoPages,

    #[error("Could not obtain a text frame on page {0}")]
    NoFrame(usize),

    #[error("Invalid ordinal pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
