//! Tiered table location
//!
//! Produces the ranked list of table candidates the crawler extracts from.
//! Detection runs an ordered list of strategies and stops at the first one
//! that yields candidates:
//!
//! 1. query the already-installed page helper
//! 2. install the helper and query once more
//! 3. reduced in-page heuristic scan
//!
//! If every strategy comes up empty the result is
//! [`ScrapeError::NoTablesFound`], a terminal user-visible condition.

use crate::error::{Result, ScrapeError};
use crate::page::{PageClient, TableCandidate};

/// Detection strategies in the order they are attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    /// Ask the helper that should already be on the page
    QueryHelper,
    /// Install the helper, then ask once more
    InstallAndRetry,
    /// Reduced scan that works without the helper
    Heuristic,
}

const STRATEGIES: [Strategy; 3] = [Strategy::QueryHelper, Strategy::InstallAndRetry, Strategy::Heuristic];

impl Strategy {
    fn run(self, page: &dyn PageClient) -> Result<Vec<TableCandidate>> {
        match self {
            Strategy::QueryHelper => page.find_tables(),
            Strategy::InstallAndRetry => {
                page.install_helper()?;
                page.find_tables()
            }
            Strategy::Heuristic => Ok(page.heuristic_scan()?.into_iter().collect()),
        }
    }
}

/// The ranked table candidates found on a page, with a cursor for the
/// "wrong table" control
#[derive(Debug, Clone)]
pub struct TableLocator {
    candidates: Vec<TableCandidate>,
    current: usize,
}

impl TableLocator {
    /// Run the detection tiers against a page.
    ///
    /// A strategy that errors or finds nothing hands over to the next tier;
    /// candidates keep their discovery order.
    pub fn locate(page: &dyn PageClient) -> Result<Self> {
        for strategy in STRATEGIES {
            match strategy.run(page) {
                Ok(candidates) if !candidates.is_empty() => {
                    log::debug!("{:?} found {} candidate(s)", strategy, candidates.len());
                    return Ok(Self { candidates, current: 0 });
                }
                Ok(_) => log::debug!("{:?} found no tables", strategy),
                Err(e) => log::debug!("{:?} failed: {}", strategy, e),
            }
        }

        Err(ScrapeError::NoTablesFound)
    }

    /// Build a locator from known candidates (used by tests and restarts)
    pub fn from_candidates(candidates: Vec<TableCandidate>) -> Result<Self> {
        if candidates.is_empty() {
            return Err(ScrapeError::NoTablesFound);
        }
        Ok(Self { candidates, current: 0 })
    }

    /// The currently selected candidate
    pub fn current(&self) -> &TableCandidate {
        &self.candidates[self.current]
    }

    /// Advance to the next candidate in ranked order ("wrong table").
    ///
    /// Errors with [`ScrapeError::NoMoreTables`] once the list is exhausted;
    /// the selection then stays on the last candidate.
    pub fn next_table(&mut self) -> Result<&TableCandidate> {
        if self.current + 1 >= self.candidates.len() {
            return Err(ScrapeError::NoMoreTables);
        }
        self.current += 1;
        Ok(self.current())
    }

    /// Number of candidates found
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Whether no candidates were found (never true for a constructed locator)
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}
