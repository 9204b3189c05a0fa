use crate::browser::session::evaluate_string;
use crate::error::{Result, ScrapeError};
use crate::page::{PageClient, PageResponse, TableCandidate, TableData};
use crate::quiesce::{self, NetworkWatch};
use headless_chrome::Tab;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Helper script installed into the page (plays the content-script role)
const HELPER_JS: &str = include_str!("helper.js");

/// Reduced in-page table detection for pages that refuse the helper
const HEURISTIC_JS: &str = include_str!("heuristic.js");

/// [`PageClient`] implementation over the Chrome DevTools Protocol.
///
/// All page operations are JavaScript evaluations against one tab; the
/// quiescence wait observes that tab's network events. Network observation
/// is attached once at construction, and waits degrade to a fixed sleep when
/// the tab does not support it.
pub struct CdpPage {
    tab: Arc<Tab>,
    watch: Option<NetworkWatch>,
}

impl CdpPage {
    /// Wrap a tab, attaching network observation when available
    pub fn new(tab: Arc<Tab>) -> Self {
        let watch = match NetworkWatch::attach(&tab) {
            Ok(watch) => Some(watch),
            Err(e) => {
                log::warn!("Network observation unavailable: {}", e);
                None
            }
        };
        Self { tab, watch }
    }

    /// The underlying tab
    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }

    /// Evaluate a helper call and deserialize the JSON-string result.
    /// A `no_helper` envelope means the helper is not installed.
    fn call<T: DeserializeOwned>(&self, js: &str) -> Result<T> {
        let raw = evaluate_string(&self.tab, js)?;

        #[derive(Deserialize)]
        struct NoHelper {
            #[serde(default)]
            no_helper: bool,
        }

        if serde_json::from_str::<NoHelper>(&raw).map(|n| n.no_helper).unwrap_or(false) {
            return Err(ScrapeError::CommunicationFailed(
                "helper script is not installed on this page".to_string(),
            ));
        }

        serde_json::from_str::<PageResponse<T>>(&raw)?.into_result()
    }

    /// Scope the next quiescence wait to the activity an upcoming click or
    /// scroll triggers
    fn begin_network_cycle(&self) {
        if let Some(watch) = &self.watch {
            watch.begin_cycle();
        }
    }
}

impl PageClient for CdpPage {
    fn find_tables(&self) -> Result<Vec<TableCandidate>> {
        #[derive(Deserialize)]
        struct FindResponse {
            tables: Vec<TableCandidate>,
        }

        let js = "JSON.stringify(window.__tableScrape \
                  ? { tables: window.__tableScrape.findTables() } \
                  : { no_helper: true })";
        let response: FindResponse = self.call(js)?;
        log::debug!("Found {} table candidates", response.tables.len());
        Ok(response.tables)
    }

    fn install_helper(&self) -> Result<()> {
        let result = evaluate_string(&self.tab, HELPER_JS)
            .map_err(|e| ScrapeError::CommunicationFailed(format!("helper injection failed: {}", e)))?;
        if result == "ok" {
            Ok(())
        } else {
            Err(ScrapeError::CommunicationFailed(format!(
                "helper injection returned unexpected result: {}",
                result
            )))
        }
    }

    fn heuristic_scan(&self) -> Result<Option<TableCandidate>> {
        let raw = evaluate_string(&self.tab, HEURISTIC_JS)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn table_data(&self, selector: &str) -> Result<TableData> {
        let js = format!(
            "JSON.stringify(window.__tableScrape \
             ? window.__tableScrape.tableData({sel}) \
             : {{ no_helper: true }})",
            sel = serde_json::to_string(selector)?
        );
        self.call(&js)
    }

    fn scroll_down(&self, selector: &str) -> Result<()> {
        #[derive(Deserialize)]
        struct Ack {
            #[serde(default)]
            #[allow(dead_code)]
            ok: bool,
        }

        self.begin_network_cycle();
        let js = format!(
            "JSON.stringify(window.__tableScrape \
             ? window.__tableScrape.scrollDown({sel}) \
             : {{ no_helper: true }})",
            sel = serde_json::to_string(selector)?
        );
        let _: Ack = self.call(&js)?;
        Ok(())
    }

    fn click_next(&self, selector: &str) -> Result<()> {
        self.begin_network_cycle();
        // A real CDP click, not a synthetic DOM event; sites that listen for
        // trusted events paginate only on these
        let element = self.tab.find_element(selector).map_err(|e| ScrapeError::Extraction {
            message: format!("\"Next\" control '{}' not found: {}", selector, e),
            slot: "error".to_string(),
        })?;
        element.click().map_err(|e| ScrapeError::Extraction {
            message: format!("Failed to click \"Next\" control: {}", e),
            slot: "error".to_string(),
        })?;
        Ok(())
    }

    fn arm_next_picker(&self) -> Result<()> {
        #[derive(Deserialize)]
        struct Ack {
            #[serde(default)]
            #[allow(dead_code)]
            ok: bool,
        }

        let js = "JSON.stringify(window.__tableScrape \
                  ? window.__tableScrape.armNextPicker() \
                  : { no_helper: true })";
        let _: Ack = self.call(js)?;
        Ok(())
    }

    fn picked_next(&self) -> Result<Option<String>> {
        #[derive(Deserialize)]
        struct PickResponse {
            selector: Option<String>,
        }

        let js = "JSON.stringify(window.__tableScrape \
                  ? { selector: window.__tableScrape.pickedNext } \
                  : { no_helper: true })";
        let response: PickResponse = self.call(js)?;
        Ok(response.selector)
    }

    fn wait_for_quiescence(&self, settle_delay: Duration, max_wait: Duration) {
        match &self.watch {
            Some(watch) => watch.wait(settle_delay, max_wait),
            None => quiesce::fallback_wait(settle_delay, max_wait),
        }
    }
}
