//! Table scraper CLI
//!
//! Drives a headless (or headed) Chrome against a URL, locates the main
//! table, optionally paginates until exhausted, and writes the collected
//! rows as CSV. Per-site settings (marked "next" control, crawl timing,
//! header edits) persist under the configuration directory between runs.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use table_scraper::{
    config::{site_identity, ConfigStore},
    BrowserSession, CdpPage, ConnectionOptions, LaunchOptions, Session, StopReason,
};

#[derive(Parser)]
#[command(name = "table-scraper")]
#[command(version)]
#[command(about = "Extract HTML tables from live pages, with pagination", long_about = None)]
struct Cli {
    /// Page to scrape
    url: String,

    /// Launch browser in headed mode (default: headless)
    #[arg(long, short = 'H')]
    headed: bool,

    /// Path to custom browser executable
    #[arg(long, value_name = "PATH")]
    chrome_path: Option<PathBuf>,

    /// WebSocket endpoint of an already-running browser
    #[arg(long, value_name = "URL")]
    ws_endpoint: Option<String>,

    /// Paginate by scrolling instead of clicking a "next" control
    #[arg(long)]
    infinite_scroll: bool,

    /// CSS selector of the "next" control (remembered per site)
    #[arg(long, value_name = "SELECTOR")]
    next_selector: Option<String>,

    /// Interactively pick the "next" control by clicking it in the browser
    /// (implies --headed)
    #[arg(long, conflicts_with = "next_selector")]
    pick_next: bool,

    /// Stop after this many pagination cycles
    #[arg(long, value_name = "N")]
    max_pages: Option<u64>,

    /// Delay between pagination cycles, in seconds
    #[arg(long, value_name = "SECS")]
    delay: Option<f64>,

    /// Ceiling on the wait for the page to settle, in seconds
    #[arg(long, value_name = "SECS")]
    max_wait: Option<f64>,

    /// Skip pagination: extract the current page only
    #[arg(long)]
    no_crawl: bool,

    /// Directory to write `<site>.csv` into
    #[arg(long, value_name = "DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Directory holding per-site configuration files
    #[arg(long, value_name = "DIR", default_value = ".table-scraper")]
    config_dir: PathBuf,

    /// Print tab-delimited text to stdout instead of writing a CSV file
    #[arg(long)]
    copy: bool,

    /// Print a preview of the collected rows (capped at 100)
    #[arg(long)]
    preview: bool,
}

/// How long the interactive next-control pick may take
const PICK_INTERVAL: Duration = Duration::from_secs(1);
const PICK_ATTEMPTS: u32 = 60;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let headed = cli.headed || cli.pick_next;
    let browser = match &cli.ws_endpoint {
        Some(ws) => BrowserSession::connect(ConnectionOptions::new(ws.clone()))
            .context("connecting to browser")?,
        None => {
            let mut options = LaunchOptions::new().headless(!headed);
            if let Some(path) = &cli.chrome_path {
                options = options.chrome_path(path);
            }
            BrowserSession::launch(options).context("launching browser")?
        }
    };

    browser.navigate(&cli.url).context("navigating to page")?;
    let url = browser.current_url()?;

    let site = site_identity(&url);
    let store = ConfigStore::new(&cli.config_dir);
    let mut config = store.load(&site);

    if let Some(selector) = &cli.next_selector {
        config.next_selector = Some(selector.clone());
    }
    if cli.infinite_scroll {
        config.infinite_scroll = true;
    }
    if let Some(secs) = cli.max_wait {
        config.set_max_wait_secs(secs)?;
    }
    if let Some(secs) = cli.delay {
        config.set_crawl_delay_secs(secs)?;
    }

    let page = CdpPage::new(browser.get_active_tab()?);
    let mut session = Session::open(&page, &url, config)?;
    eprintln!(
        "Located table on '{}': {} row(s) extracted",
        session.site(),
        session.dataset().len()
    );

    if cli.pick_next {
        eprintln!("Click the \"Next\" control in the browser window...");
        match session.mark_next(&page, PICK_INTERVAL, PICK_ATTEMPTS)? {
            Some(selector) => eprintln!("Marked \"Next\" control: {selector}"),
            None => anyhow::bail!("no element was picked within the time limit"),
        }
    }

    if !cli.no_crawl
        && (session.config().infinite_scroll || session.next_selector().is_some())
    {
        let reason = session.crawl(&page, cli.max_pages)?;
        let stats = session.stats();
        eprintln!(
            "Crawl finished ({}): {} page(s), {} row(s), {:.1}s working time",
            match reason {
                StopReason::Exhausted => "no new rows",
                StopReason::UserStopped => "stopped",
                StopReason::PageLimit => "page limit",
            },
            stats.pages,
            session.dataset().len(),
            stats.working_time.as_secs_f64()
        );
    }

    if session.failed_to_process() {
        eprintln!("Warning: failed to process rows, raw column data was collected");
    }

    if cli.preview {
        let (rows, truncated) = session.preview();
        if let Some(first) = rows.first() {
            let labels: Vec<&str> = first.keys().collect();
            eprintln!("{}", labels.join(" | "));
        }
        for row in &rows {
            let cells: Vec<&str> = row.iter().map(|(_, v)| v).collect();
            eprintln!("{}", cells.join(" | "));
        }
        if truncated {
            eprintln!("(preview limited to the first {} rows)", rows.len());
        }
    }

    store.save(&site, session.config())?;

    if cli.copy {
        print!("{}", session.clipboard_text());
    } else {
        let path = session.export_csv(&cli.out_dir)?;
        eprintln!("Wrote {}", path.display());
    }

    if cli.ws_endpoint.is_none() {
        browser.close()?;
    }
    Ok(())
}
