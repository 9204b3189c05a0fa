//! # table-scraper
//!
//! A Rust library for extracting HTML tables from live pages via Chrome
//! DevTools Protocol (CDP), with click-through and infinite-scroll
//! pagination, deduplication and CSV export.
//!
//! ## Features
//!
//! - **Table Location**: Tiered detection of table-like structures (in-page
//!   helper, helper injection retry, reduced heuristic fallback)
//! - **Pagination Crawling**: Sequential next-click or scroll cycles with a
//!   network-quiescence wait between them, stopping when a cycle yields no
//!   new rows
//! - **Deduplication**: Rows are merged across pages by their full field
//!   set, first-seen order preserved
//! - **Export**: CSV files and tab-delimited clipboard text, with per-site
//!   header renames and hidden columns
//! - **Per-Site Configuration**: Crawl timing, the marked "next" control and
//!   column edits persist per site identity as JSON
//!
//! ## Command Line
//!
//! ```bash
//! # Scrape a page, clicking the given "next" control until exhausted
//! cargo run -- https://example.com/listings --next-selector "a.next"
//!
//! # Infinite-scroll pagination with a visible browser
//! cargo run -- https://example.com/feed --infinite-scroll --headed
//! ```
//!
//! ## Library Usage
//!
//! ```rust,no_run
//! use table_scraper::{BrowserSession, CdpPage, LaunchOptions, Session, SiteConfig};
//!
//! # fn main() -> table_scraper::Result<()> {
//! let browser = BrowserSession::launch(LaunchOptions::default())?;
//! browser.navigate("https://example.com/listings")?;
//!
//! let page = CdpPage::new(browser.get_active_tab()?);
//! let mut config = SiteConfig::default();
//! config.next_selector = Some("a.next".to_string());
//!
//! let mut session = Session::open(&page, &browser.current_url()?, config)?;
//! session.crawl(&page, None)?;
//! println!("Collected {} rows", session.dataset().len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`browser`]: Browser session management and configuration
//! - [`page`]: The page channel: [`PageClient`] trait and its CDP implementation
//! - [`locate`]: Tiered table location
//! - [`table`]: Row and dataset types, deduplication
//! - [`crawler`]: Session lifecycle and the pagination control loop
//! - [`quiesce`]: Network-quiescence detection over CDP events
//! - [`export`]: CSV encoding/decoding and file output
//! - [`config`]: Per-site persisted configuration
//! - [`error`]: Error types and result aliases

pub mod browser;
pub mod config;
pub mod crawler;
pub mod error;
pub mod export;
pub mod locate;
pub mod page;
pub mod quiesce;
pub mod table;

pub use browser::{BrowserSession, ConnectionOptions, LaunchOptions};
pub use config::{ConfigStore, SiteConfig};
pub use crawler::{CrawlState, CrawlStats, Session, StopHandle, StopReason};
pub use error::{Result, ScrapeError};
pub use export::Delimiter;
pub use locate::TableLocator;
pub use page::{CdpPage, PageClient, TableCandidate, TableData};
pub use table::{Dataset, Row};
