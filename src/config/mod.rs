//! Per-site configuration
//!
//! Header renames, deleted fields and crawl timing are remembered per site
//! identity (the first non-"www" label of the page's hostname) as one JSON
//! file per site. Timing values are entered in whole or fractional seconds
//! and stored in milliseconds; the crawl delay must stay strictly below the
//! max wait, enforced symmetrically at the setter boundary so an invalid
//! edit never clobbers the last valid value.

use crate::error::{Result, ScrapeError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Default delay between pagination cycles
pub const DEFAULT_CRAWL_DELAY_MS: u64 = 1_000;

/// Default ceiling on the quiescence wait
pub const DEFAULT_MAX_WAIT_MS: u64 = 20_000;

fn default_crawl_delay() -> u64 {
    DEFAULT_CRAWL_DELAY_MS
}

fn default_max_wait() -> u64 {
    DEFAULT_MAX_WAIT_MS
}

/// Configuration persisted per site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Raw column key → display label
    #[serde(default)]
    pub headers: IndexMap<String, String>,

    /// Columns hidden from previews
    #[serde(default)]
    pub deleted_fields: BTreeSet<String>,

    /// Minimum delay between pagination cycles, in milliseconds
    #[serde(default = "default_crawl_delay")]
    pub crawl_delay_ms: u64,

    /// Quiescence wait ceiling, in milliseconds
    #[serde(default = "default_max_wait")]
    pub max_wait_ms: u64,

    /// Previously marked "next" control for this site
    #[serde(default)]
    pub next_selector: Option<String>,

    /// Paginate by scrolling instead of clicking "next"
    #[serde(default)]
    pub infinite_scroll: bool,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            headers: IndexMap::new(),
            deleted_fields: BTreeSet::new(),
            crawl_delay_ms: DEFAULT_CRAWL_DELAY_MS,
            max_wait_ms: DEFAULT_MAX_WAIT_MS,
            next_selector: None,
            infinite_scroll: false,
        }
    }
}

impl SiteConfig {
    /// Delay between cycles
    pub fn crawl_delay(&self) -> Duration {
        Duration::from_millis(self.crawl_delay_ms)
    }

    /// Quiescence settle window: the crawl delay doubles as the debounce
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.crawl_delay_ms)
    }

    /// Quiescence ceiling
    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }

    /// Set the crawl delay from a seconds value entered by the user.
    ///
    /// Rejected (keeping the previous value) when not a finite non-negative
    /// number or when it would reach the max wait.
    pub fn set_crawl_delay_secs(&mut self, secs: f64) -> Result<()> {
        if !secs.is_finite() || secs < 0.0 {
            return Err(ScrapeError::InvalidConfig {
                field: "crawl delay",
                reason: "must be a non-negative number of seconds".to_string(),
            });
        }
        let ms = (secs * 1000.0) as u64;
        if ms >= self.max_wait_ms {
            return Err(ScrapeError::InvalidConfig {
                field: "crawl delay",
                reason: format!("must stay below the max wait ({}s)", self.max_wait_ms as f64 / 1000.0),
            });
        }
        self.crawl_delay_ms = ms;
        Ok(())
    }

    /// Set the max wait from a seconds value entered by the user.
    ///
    /// Rejected (keeping the previous value) when not a finite positive
    /// number or when it would not exceed the crawl delay.
    pub fn set_max_wait_secs(&mut self, secs: f64) -> Result<()> {
        if !secs.is_finite() || secs < 0.0 {
            return Err(ScrapeError::InvalidConfig {
                field: "max wait",
                reason: "must be a non-negative number of seconds".to_string(),
            });
        }
        let ms = (secs * 1000.0) as u64;
        if ms <= self.crawl_delay_ms {
            return Err(ScrapeError::InvalidConfig {
                field: "max wait",
                reason: format!("must exceed the crawl delay ({}s)", self.crawl_delay_ms as f64 / 1000.0),
            });
        }
        self.max_wait_ms = ms;
        Ok(())
    }

    /// Rename a column for display and export
    pub fn rename_header(&mut self, raw: impl Into<String>, label: impl Into<String>) {
        self.headers.insert(raw.into(), label.into());
    }

    /// Hide a column from previews
    pub fn delete_field(&mut self, key: impl Into<String>) {
        self.deleted_fields.insert(key.into());
    }

    /// Restore all hidden columns
    pub fn reset_fields(&mut self) {
        self.deleted_fields.clear();
    }
}

/// Loads and saves one [`SiteConfig`] JSON file per site identity
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    /// A store rooted at `dir` (created on first save)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, site: &str) -> PathBuf {
        self.dir.join(format!("{site}-config.json"))
    }

    /// Load the configuration for a site, falling back to defaults when the
    /// file is missing or unreadable
    pub fn load(&self, site: &str) -> SiteConfig {
        let path = self.path_for(site);
        match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(config) => config,
                Err(e) => {
                    log::warn!("Ignoring unparseable config {}: {}", path.display(), e);
                    SiteConfig::default()
                }
            },
            Err(_) => SiteConfig::default(),
        }
    }

    /// Persist the configuration for a site
    pub fn save(&self, site: &str, config: &SiteConfig) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(site);
        fs::write(&path, serde_json::to_string_pretty(config)?)?;
        log::debug!("Saved config for '{}' to {}", site, path.display());
        Ok(())
    }
}

/// The hostname part of a URL, lowercased, without port or userinfo
fn host_of(url: &str) -> Option<&str> {
    let rest = url.split("://").nth(1)?;
    let rest = rest.split(['/', '?', '#']).next()?;
    let rest = rest.rsplit('@').next()?;
    let host = rest.split(':').next()?;
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

/// Short site label used as the configuration key: the first hostname label,
/// or the second when the first contains "www". Unparseable URLs map to
/// "unknown".
pub fn site_identity(url: &str) -> String {
    let Some(host) = host_of(url) else {
        return "unknown".to_string();
    };
    let labels: Vec<&str> = host.split('.').collect();
    let label = if labels[0].contains("www") && labels.len() > 1 {
        labels[1]
    } else {
        labels[0]
    };
    label.to_lowercase()
}

/// Schemes that point at browser-internal pages
const RESTRICTED_SCHEMES: [&str; 6] =
    ["about:", "chrome:", "chrome-extension:", "moz-extension:", "devtools:", "view-source:"];

/// Reject pages that cannot be scraped before any table location attempt
pub fn check_page_supported(url: &str) -> Result<()> {
    let lowered = url.trim().to_lowercase();

    for scheme in RESTRICTED_SCHEMES {
        if lowered.starts_with(scheme) {
            return Err(ScrapeError::UnsupportedPage(
                "Cannot access browser internal pages. Please navigate to a regular webpage.".to_string(),
            ));
        }
    }

    if let Some(host) = host_of(&lowered) {
        if host == "linkedin.com" || host.ends_with(".linkedin.com") {
            return Err(ScrapeError::UnsupportedPage(
                "We're unable to collect data from LinkedIn. Sorry for the inconvenience.".to_string(),
            ));
        }
    }

    Ok(())
}
