//! Page channel
//!
//! The interface the crawler uses to talk to the page being scraped. On a
//! live browser this is implemented by [`CdpPage`], which evaluates small
//! JavaScript snippets over CDP (the in-page helper plays the role a content
//! script would in an extension). Tests implement [`PageClient`] directly.

pub mod cdp;

#[cfg(test)]
pub(crate) mod test_support;

pub use cdp::CdpPage;

use crate::error::{Result, ScrapeError};
use crate::table::Row;
use serde::Deserialize;
use std::time::Duration;

/// A table-like structure discovered on the page, ranked by discovery order
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TableCandidate {
    /// Position in the ranked candidate list
    pub table_id: usize,

    /// CSS selector identifying the structure
    pub selector: String,

    /// Row (or child) count that qualified the candidate
    pub row_count: usize,
}

/// One extraction result from the page
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableData {
    /// Extracted rows in page order
    #[serde(default)]
    pub rows: Vec<Row>,

    /// Structured processing failed and `rows` holds raw positional columns.
    /// Non-fatal: a warning is shown and crawling continues.
    #[serde(default)]
    pub failed_to_process: bool,

    /// Why processing failed, when the page reported it
    #[serde(default)]
    pub processing_error: Option<String>,
}

/// Operations the crawler needs from the page being scraped.
///
/// Table discovery, extraction, navigation actions, the next-control picker
/// and the quiescence wait are all page-scoped, so they live behind one
/// trait with a CDP implementation and an in-memory test double.
pub trait PageClient {
    /// Ask the installed helper for ranked table candidates.
    /// Fails with [`ScrapeError::CommunicationFailed`] when the helper is
    /// not reachable.
    fn find_tables(&self) -> Result<Vec<TableCandidate>>;

    /// Install the in-page helper script
    fn install_helper(&self) -> Result<()>;

    /// Reduced in-page heuristic used when the helper cannot be installed:
    /// first `<table>` with more than 2 rows, else the first table-like
    /// element with more than 3 children
    fn heuristic_scan(&self) -> Result<Option<TableCandidate>>;

    /// Extract the current rows of the structure at `selector`
    fn table_data(&self, selector: &str) -> Result<TableData>;

    /// Scroll the page (or the scrolling container of `selector`) to the
    /// bottom, for infinite-scroll pagination
    fn scroll_down(&self, selector: &str) -> Result<()>;

    /// Click the "next" control at `selector`
    fn click_next(&self, selector: &str) -> Result<()>;

    /// Install a one-shot click recorder so the user can mark the "next"
    /// control on the page
    fn arm_next_picker(&self) -> Result<()>;

    /// The selector the user picked, once they have clicked something
    fn picked_next(&self) -> Result<Option<String>>;

    /// Block until the page has settled after an action, bounded by `max_wait`
    fn wait_for_quiescence(&self, settle_delay: Duration, max_wait: Duration);
}

/// Error payload a page script can return instead of data
#[derive(Debug, Clone, Deserialize)]
pub struct PageError {
    /// Error text surfaced verbatim to the user
    pub error: String,

    /// UI slot to show the message in
    #[serde(default)]
    pub error_id: Option<String>,
}

impl From<PageError> for ScrapeError {
    fn from(err: PageError) -> Self {
        ScrapeError::Extraction {
            message: err.error,
            slot: err.error_id.unwrap_or_else(|| "error".to_string()),
        }
    }
}

/// Either an error payload or the expected response body
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PageResponse<T> {
    /// The page reported an error descriptor
    Err(PageError),
    /// The page returned the expected payload
    Ok(T),
}

impl<T> PageResponse<T> {
    /// Convert into a Result, mapping error payloads to [`ScrapeError`]
    pub fn into_result(self) -> Result<T> {
        match self {
            PageResponse::Ok(value) => Ok(value),
            PageResponse::Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_data_deserialization_preserves_key_order() {
        let json = r#"{"rows": [{"Zeta": "1", "Alpha": "2"}]}"#;
        let data: TableData = serde_json::from_str(json).unwrap();

        let keys: Vec<&str> = data.rows[0].keys().collect();
        assert_eq!(keys, vec!["Zeta", "Alpha"]);
        assert!(!data.failed_to_process);
    }

    #[test]
    fn test_page_response_error_payload() {
        let json = r#"{"error": "Table not found", "error_id": "noResponseErr"}"#;
        let response: PageResponse<TableData> = serde_json::from_str(json).unwrap();

        let err = response.into_result().unwrap_err();
        assert!(matches!(err, ScrapeError::Extraction { .. }));
        assert_eq!(err.slot(), "noResponseErr");
    }

    #[test]
    fn test_page_response_ok_payload() {
        let json = r#"{"rows": [], "failed_to_process": true, "processing_error": "bad cells"}"#;
        let response: PageResponse<TableData> = serde_json::from_str(json).unwrap();

        let data = response.into_result().unwrap();
        assert!(data.failed_to_process);
        assert_eq!(data.processing_error.as_deref(), Some("bad cells"));
    }

    #[test]
    fn test_error_slot_defaults() {
        let err: ScrapeError = PageError { error: "x".into(), error_id: None }.into();
        assert_eq!(err.slot(), "error");
    }
}
