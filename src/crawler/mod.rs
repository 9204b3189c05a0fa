//! Pagination control loop
//!
//! A [`Session`] owns everything collected for one page: the located table,
//! the accumulated dataset, crawl statistics and the per-site configuration.
//! Crawling runs strictly sequential cycles of advance → quiescence wait →
//! extract → merge → stats, and stops on user request, extraction error or
//! when a cycle contributes no new rows.

use crate::config::{check_page_supported, site_identity, SiteConfig};
use crate::error::{Result, ScrapeError};
use crate::export;
use crate::locate::TableLocator;
use crate::page::PageClient;
use crate::table::{dataset::PREVIEW_LIMIT, Dataset, Row};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Lifecycle of a scraping session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    /// Nothing located yet
    Idle,
    /// Table detection in progress
    Locating,
    /// Table located, not crawling
    Ready,
    /// Pagination cycles running
    Scraping,
    /// Crawling halted (user request, exhaustion or error)
    Stopped,
}

/// Why a crawl run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A cycle contributed no new rows; pagination has converged
    Exhausted,
    /// The user requested a stop
    UserStopped,
    /// The configured page limit was reached
    PageLimit,
}

/// Crawl statistics shown to the user
#[derive(Debug, Clone, Default)]
pub struct CrawlStats {
    /// Pages scraped, the initial extraction included
    pub pages: u64,
    /// Row count of the most recent extraction, before deduplication
    pub last_rows: usize,
    /// Cumulative time spent in pagination cycles
    pub working_time: Duration,
}

/// Cancellation flag that can be shared with another thread (e.g. a Ctrl-C
/// handler). Polled at cycle boundaries only; an in-flight cycle finishes.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Ask the crawl loop to stop before its next cycle
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether a stop has been requested
    pub fn requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Poll `f` at a fixed interval until it yields a value, the attempt budget
/// runs out, or `cancel` is set. One probe is pending at a time and the
/// total number of probes is bounded.
pub fn poll_until<T>(
    interval: Duration,
    max_attempts: u32,
    cancel: &StopHandle,
    mut f: impl FnMut() -> Result<Option<T>>,
) -> Result<Option<T>> {
    for attempt in 0..max_attempts {
        if cancel.requested() {
            return Ok(None);
        }
        if let Some(value) = f()? {
            return Ok(Some(value));
        }
        if attempt + 1 < max_attempts {
            std::thread::sleep(interval);
        }
    }
    Ok(None)
}

/// One scraping session against one page.
///
/// Created when the page's table is first located; lives for as long as the
/// caller keeps it. The dataset survives stop/restart, so a restarted crawl
/// resumes where it left off.
#[derive(Debug)]
pub struct Session {
    site: String,
    locator: TableLocator,
    next_selector: Option<String>,
    dataset: Dataset,
    stats: CrawlStats,
    config: SiteConfig,
    state: CrawlState,
    stop: StopHandle,
    failed_to_process: bool,
}

impl Session {
    /// Open a session against a supported page: check the URL, locate a
    /// table and run the initial extraction.
    pub fn open(page: &dyn PageClient, url: &str, config: SiteConfig) -> Result<Self> {
        check_page_supported(url)?;

        let site = site_identity(url);
        log::debug!("Opening session for site '{}'", site);

        let locator = TableLocator::locate(page)?;
        let next_selector = config.next_selector.clone();

        let mut session = Self {
            site,
            locator,
            next_selector,
            dataset: Dataset::new(),
            stats: CrawlStats::default(),
            config,
            state: CrawlState::Locating,
            stop: StopHandle::default(),
            failed_to_process: false,
        };
        session.extract_current(page)?;
        session.state = CrawlState::Ready;

        Ok(session)
    }

    /// Replace the dataset with a fresh extraction of the current candidate
    fn extract_current(&mut self, page: &dyn PageClient) -> Result<()> {
        let selector = self.locator.current().selector.clone();
        let data = page.table_data(&selector)?;

        self.note_processing(data.failed_to_process, data.processing_error.as_deref());
        self.stats.last_rows = data.rows.len();
        self.stats.pages = 1;
        self.dataset = Dataset::from_rows(data.rows);

        Ok(())
    }

    fn note_processing(&mut self, failed: bool, why: Option<&str>) {
        self.failed_to_process = failed;
        if failed {
            log::warn!(
                "Failed to process rows, showing raw data instead{}",
                why.map(|w| format!(": {w}")).unwrap_or_default()
            );
        }
    }

    /// Advance to the next table candidate ("wrong table") and re-extract.
    /// Errors with [`ScrapeError::NoMoreTables`] once exhausted.
    pub fn wrong_table(&mut self, page: &dyn PageClient) -> Result<()> {
        self.locator.next_table()?;
        self.extract_current(page)
    }

    /// Wait for the user to mark the "next" control on the page.
    ///
    /// Arms the in-page click picker, then polls for the picked selector at
    /// `interval` for at most `max_attempts` probes. A successful pick is
    /// remembered in the session and its configuration.
    pub fn mark_next(
        &mut self,
        page: &dyn PageClient,
        interval: Duration,
        max_attempts: u32,
    ) -> Result<Option<String>> {
        page.arm_next_picker()?;

        let picked = poll_until(interval, max_attempts, &self.stop.clone(), || page.picked_next())?;

        if let Some(selector) = &picked {
            log::debug!("\"Next\" control marked: {}", selector);
            self.next_selector = Some(selector.clone());
            self.config.next_selector = Some(selector.clone());
        }
        Ok(picked)
    }

    /// Run pagination cycles until stopped, exhausted, a page limit is hit
    /// or extraction fails.
    ///
    /// Requires infinite-scroll mode or a marked "next" control. Cycles are
    /// strictly sequential: the next advance never starts before the
    /// previous merge and stats update complete. On an extraction error the
    /// session transitions to Stopped and the error is surfaced; the rows
    /// collected so far are retained.
    pub fn crawl(&mut self, page: &dyn PageClient, max_pages: Option<u64>) -> Result<StopReason> {
        if !self.config.infinite_scroll && self.next_selector.is_none() {
            return Err(ScrapeError::InvalidConfig {
                field: "next control",
                reason: "mark the \"Next\" control or enable infinite scroll before crawling".to_string(),
            });
        }

        self.stop.clear();
        self.state = CrawlState::Scraping;
        let mut pages_this_run = 0u64;

        loop {
            if self.stop.requested() {
                self.state = CrawlState::Stopped;
                return Ok(StopReason::UserStopped);
            }
            if let Some(limit) = max_pages {
                if pages_this_run >= limit {
                    self.state = CrawlState::Stopped;
                    return Ok(StopReason::PageLimit);
                }
            }

            let cycle_start = Instant::now();

            // (a) advance the page
            let advance = if self.config.infinite_scroll {
                page.scroll_down(&self.locator.current().selector)
            } else {
                // Checked above: crawling without infinite scroll requires a selector
                let next = self.next_selector.as_deref().unwrap_or_default();
                page.click_next(next)
            };
            if let Err(e) = advance {
                self.state = CrawlState::Stopped;
                return Err(e);
            }

            // (b) let the page settle
            page.wait_for_quiescence(self.config.settle_delay(), self.config.max_wait());

            // (c) extract
            let selector = self.locator.current().selector.clone();
            let data = match page.table_data(&selector) {
                Ok(data) => data,
                Err(e) => {
                    self.state = CrawlState::Stopped;
                    return Err(e);
                }
            };
            self.note_processing(data.failed_to_process, data.processing_error.as_deref());

            // (d) merge and update stats
            self.stats.last_rows = data.rows.len();
            let added = self.dataset.merge(data.rows);
            self.stats.pages += 1;
            pages_this_run += 1;
            self.stats.working_time += cycle_start.elapsed();

            log::debug!(
                "Cycle {}: {} extracted, {} new, {} total",
                self.stats.pages,
                self.stats.last_rows,
                added,
                self.dataset.len()
            );

            // (e) converged?
            if added == 0 {
                self.state = CrawlState::Stopped;
                return Ok(StopReason::Exhausted);
            }

            if self.stop.requested() {
                self.state = CrawlState::Stopped;
                return Ok(StopReason::UserStopped);
            }
            std::thread::sleep(self.config.crawl_delay());
        }
    }

    /// Handle for requesting a stop from another thread
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Current lifecycle state
    pub fn state(&self) -> CrawlState {
        self.state
    }

    /// Site identity this session is keyed under
    pub fn site(&self) -> &str {
        &self.site
    }

    /// The accumulated dataset
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Crawl statistics
    pub fn stats(&self) -> &CrawlStats {
        &self.stats
    }

    /// Per-site configuration (mutated by `mark_next` and setting edits)
    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Mutable access for configuration edits
    pub fn config_mut(&mut self) -> &mut SiteConfig {
        &mut self.config
    }

    /// The marked "next" control, if any
    pub fn next_selector(&self) -> Option<&str> {
        self.next_selector.as_deref()
    }

    /// Whether the latest extraction fell back to raw data
    pub fn failed_to_process(&self) -> bool {
        self.failed_to_process
    }

    /// Preview rows capped at the display limit, with deleted fields
    /// removed and headers renamed. Returns the rows and whether the
    /// dataset was truncated.
    pub fn preview(&self) -> (Vec<Row>, bool) {
        let (rows, truncated) = self.dataset.preview(PREVIEW_LIMIT);
        let filtered = rows
            .iter()
            .map(|row| {
                row.iter()
                    .filter(|(key, _)| !self.config.deleted_fields.contains(*key))
                    .map(|(key, value)| {
                        let label = self.config.headers.get(key).map(String::as_str).unwrap_or(key);
                        (label.to_string(), value.to_string())
                    })
                    .collect()
            })
            .collect();
        (filtered, truncated)
    }

    /// Write the dataset as `<site>.csv` under `out_dir`
    pub fn export_csv(&self, out_dir: &Path) -> Result<PathBuf> {
        export::write_csv_file(&self.dataset, &self.config.headers, &self.site, out_dir)
    }

    /// Tab-delimited text for the clipboard
    pub fn clipboard_text(&self) -> String {
        export::clipboard_text(&self.dataset, &self.config.headers)
    }
}
