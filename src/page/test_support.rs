//! Scriptable in-memory [`PageClient`] for unit tests

use crate::error::{Result, ScrapeError};
use crate::page::{PageClient, TableCandidate, TableData};
use crate::table::Row;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::time::Duration;

/// One scripted reply to `table_data`
#[derive(Debug, Clone)]
pub enum MockBatch {
    /// Rows extracted normally
    Rows(Vec<Row>),
    /// Degraded extraction: raw rows plus a processing error
    Degraded(Vec<Row>, String),
    /// The page reported an error payload
    Error(String),
}

/// A fake page whose responses are scripted up front.
///
/// `table_data` replies are consumed in order; once the script runs out,
/// further extractions return the empty batch (which reads as "no new
/// rows" to the crawler).
pub struct MockPage {
    tables: Vec<TableCandidate>,
    heuristic: Option<TableCandidate>,
    helper_present: Cell<bool>,
    injection_ok: bool,
    install_calls: Cell<usize>,
    batches: RefCell<VecDeque<MockBatch>>,
    picked: RefCell<VecDeque<Option<String>>>,
    scrolls: Cell<usize>,
    clicks: Cell<usize>,
    waits: Cell<usize>,
}

impl MockPage {
    /// A page whose helper is present and reports the given candidates
    pub fn with_tables(tables: Vec<TableCandidate>) -> Self {
        Self {
            tables,
            heuristic: None,
            helper_present: Cell::new(true),
            injection_ok: true,
            install_calls: Cell::new(0),
            batches: RefCell::new(VecDeque::new()),
            picked: RefCell::new(VecDeque::new()),
            scrolls: Cell::new(0),
            clicks: Cell::new(0),
            waits: Cell::new(0),
        }
    }

    /// A page with no tables at all
    pub fn empty() -> Self {
        Self::with_tables(Vec::new())
    }

    /// The helper is not installed yet; queries fail until injection
    pub fn helper_missing(self) -> Self {
        self.helper_present.set(false);
        self
    }

    /// Injection is refused by the page
    pub fn injection_fails(mut self) -> Self {
        self.injection_ok = false;
        self
    }

    /// What the reduced heuristic scan finds
    pub fn heuristic_result(mut self, candidate: Option<TableCandidate>) -> Self {
        self.heuristic = candidate;
        self
    }

    /// Append a scripted extraction reply
    pub fn push_batch(self, batch: MockBatch) -> Self {
        self.batches.borrow_mut().push_back(batch);
        self
    }

    /// Append a scripted `picked_next` reply
    pub fn push_pick(self, pick: Option<&str>) -> Self {
        self.picked.borrow_mut().push_back(pick.map(str::to_string));
        self
    }

    pub fn install_calls(&self) -> usize {
        self.install_calls.get()
    }

    pub fn scrolls(&self) -> usize {
        self.scrolls.get()
    }

    pub fn clicks(&self) -> usize {
        self.clicks.get()
    }

    pub fn waits(&self) -> usize {
        self.waits.get()
    }
}

impl PageClient for MockPage {
    fn find_tables(&self) -> Result<Vec<TableCandidate>> {
        if !self.helper_present.get() {
            return Err(ScrapeError::CommunicationFailed("no helper".to_string()));
        }
        Ok(self.tables.clone())
    }

    fn install_helper(&self) -> Result<()> {
        self.install_calls.set(self.install_calls.get() + 1);
        if self.injection_ok {
            self.helper_present.set(true);
            Ok(())
        } else {
            Err(ScrapeError::CommunicationFailed("injection refused".to_string()))
        }
    }

    fn heuristic_scan(&self) -> Result<Option<TableCandidate>> {
        Ok(self.heuristic.clone())
    }

    fn table_data(&self, _selector: &str) -> Result<TableData> {
        match self.batches.borrow_mut().pop_front() {
            Some(MockBatch::Rows(rows)) => Ok(TableData { rows, ..TableData::default() }),
            Some(MockBatch::Degraded(rows, why)) => Ok(TableData {
                rows,
                failed_to_process: true,
                processing_error: Some(why),
            }),
            Some(MockBatch::Error(message)) => Err(ScrapeError::Extraction {
                message,
                slot: "error".to_string(),
            }),
            None => Ok(TableData::default()),
        }
    }

    fn scroll_down(&self, _selector: &str) -> Result<()> {
        self.scrolls.set(self.scrolls.get() + 1);
        Ok(())
    }

    fn click_next(&self, _selector: &str) -> Result<()> {
        self.clicks.set(self.clicks.get() + 1);
        Ok(())
    }

    fn arm_next_picker(&self) -> Result<()> {
        Ok(())
    }

    fn picked_next(&self) -> Result<Option<String>> {
        Ok(self.picked.borrow_mut().pop_front().flatten())
    }

    fn wait_for_quiescence(&self, _settle_delay: Duration, _max_wait: Duration) {
        self.waits.set(self.waits.get() + 1);
    }
}
