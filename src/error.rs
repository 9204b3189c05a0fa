use thiserror::Error;

/// Errors that can occur while driving the browser or collecting table data
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Failed to launch the browser
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    /// Failed to connect to an existing browser
    #[error("Failed to connect to browser: {0}")]
    ConnectionFailed(String),

    /// Navigation failed or timed out
    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    /// Tab operation failed (create, activate, close, enumerate)
    #[error("Tab operation failed: {0}")]
    TabOperationFailed(String),

    /// JavaScript evaluation in the page failed
    #[error("JavaScript evaluation failed: {0}")]
    EvaluationFailed(String),

    /// The in-page helper is not reachable (not yet installed, or the page
    /// refused the injection). Recovered by installing the helper and
    /// retrying before being surfaced.
    #[error("Page helper unreachable: {0}")]
    CommunicationFailed(String),

    /// The page cannot be scraped (restricted scheme, unsupported host)
    #[error("Unsupported page: {0}")]
    UnsupportedPage(String),

    /// No table-like structure was found on the page.
    /// This is a terminal user-visible condition, not an internal bug.
    #[error("No tables found on this page")]
    NoTablesFound,

    /// The "wrong table" control ran past the last candidate
    #[error("No more tables found on this page")]
    NoMoreTables,

    /// The page reported an extraction error payload
    #[error("Extraction failed: {message}")]
    Extraction {
        /// Error text surfaced verbatim to the user
        message: String,
        /// UI slot the message is tied to (e.g. "error", "noResponseErr")
        slot: String,
    },

    /// A configuration value was rejected at the input boundary
    #[error("Invalid {field}: {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: String,
    },

    /// Reading or writing persisted configuration or export files failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing or deserializing JSON failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using ScrapeError
pub type Result<T> = std::result::Result<T, ScrapeError>;

impl ScrapeError {
    /// The UI slot an error message should be shown in.
    pub fn slot(&self) -> &str {
        match self {
            ScrapeError::Extraction { slot, .. } => slot,
            ScrapeError::InvalidConfig { .. } => "inputError",
            ScrapeError::NoTablesFound | ScrapeError::UnsupportedPage(_) => "noResponseErr",
            _ => "error",
        }
    }
}
