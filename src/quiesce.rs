//! Page quiescence detection
//!
//! Decides when a navigation or scroll action has "settled" so extraction can
//! safely run. [`QuiescenceDetector`] is a pure state machine over network
//! activity events and an injected clock; [`NetworkWatch`] drives it from CDP
//! `Network` domain events on a tab. A page counts as settled once no network
//! activity has occurred for the settle delay with nothing in flight, or
//! unconditionally after the max-wait ceiling (pages with infinite polling
//! never quiesce on their own).

use crate::error::{Result, ScrapeError};
use headless_chrome::protocol::cdp::types::Event;
use headless_chrome::protocol::cdp::Network;
use headless_chrome::Tab;
use std::collections::HashSet;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How often the waiting loop wakes up to re-check the detector
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Extra settling time granted when network observation is unavailable
const FALLBACK_DELAY: Duration = Duration::from_millis(500);

/// Network activity on the observed tab
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    /// A request started; the id stays in flight until it finishes or fails
    RequestStarted(String),
    /// A request completed
    RequestFinished(String),
    /// A request errored out
    RequestFailed(String),
}

/// Tracks in-flight requests and reports a single "settled" verdict.
///
/// Either the debounce path (quiet for the settle delay with zero requests
/// in flight) or the timeout path (max wait elapsed) may produce the
/// verdict; whichever comes first wins and the other is suppressed.
#[derive(Debug)]
pub struct QuiescenceDetector {
    settle_delay: Duration,
    max_wait: Duration,
    started: Instant,
    last_start: Instant,
    inflight: HashSet<String>,
    fired: bool,
}

impl QuiescenceDetector {
    /// Start observing at `now`
    pub fn new(settle_delay: Duration, max_wait: Duration, now: Instant) -> Self {
        Self {
            settle_delay,
            max_wait,
            started: now,
            last_start: now,
            inflight: HashSet::new(),
            fired: false,
        }
    }

    /// Feed one network event observed at `now`
    pub fn observe(&mut self, event: &NetworkEvent, now: Instant) {
        match event {
            NetworkEvent::RequestStarted(id) => {
                self.inflight.insert(id.clone());
                self.last_start = now;
            }
            NetworkEvent::RequestFinished(id) | NetworkEvent::RequestFailed(id) => {
                self.inflight.remove(id);
            }
        }
    }

    /// Check whether the page has settled as of `now`.
    ///
    /// Returns true at most once per detector instance.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.fired {
            return false;
        }

        let timed_out = now.duration_since(self.started) >= self.max_wait;
        let quiet = self.inflight.is_empty()
            && now.duration_since(self.last_start) >= self.settle_delay;

        if timed_out || quiet {
            self.fired = true;
            log::debug!(
                "Page settled after {:?} ({})",
                now.duration_since(self.started),
                if timed_out { "max wait reached" } else { "network quiet" }
            );
            return true;
        }

        false
    }

    /// Number of requests currently in flight
    pub fn inflight(&self) -> usize {
        self.inflight.len()
    }
}

/// CDP network observation for one tab.
///
/// Attaching enables the `Network` domain and installs an event listener that
/// forwards request lifecycle events over a channel. One watch per tab.
/// Observation is scoped per action: the caller drains the backlog with
/// [`begin_cycle`](Self::begin_cycle) before performing a click or scroll, so
/// the following [`wait`](Self::wait) tracks every request the action itself
/// triggers, including ones that start before the wait runs.
pub struct NetworkWatch {
    rx: Receiver<NetworkEvent>,
}

impl NetworkWatch {
    /// Enable network events on the tab and start listening
    pub fn attach(tab: &Arc<Tab>) -> Result<Self> {
        tab.call_method(Network::Enable {
            max_total_buffer_size: None,
            max_resource_buffer_size: None,
            max_post_data_size: None,
            enable_durable_messages: None,
            report_direct_socket_traffic: None,
        })
        .map_err(|e| ScrapeError::TabOperationFailed(format!("Failed to enable network events: {}", e)))?;

        let (tx, rx) = mpsc::channel();
        tab.add_event_listener(Arc::new(move |event: &Event| {
            let mapped = match event {
                Event::NetworkRequestWillBeSent(e) => {
                    Some(NetworkEvent::RequestStarted(e.params.request_id.clone()))
                }
                Event::NetworkLoadingFinished(e) => {
                    Some(NetworkEvent::RequestFinished(e.params.request_id.clone()))
                }
                Event::NetworkLoadingFailed(e) => {
                    Some(NetworkEvent::RequestFailed(e.params.request_id.clone()))
                }
                _ => None,
            };
            if let Some(ev) = mapped {
                // The receiver may be gone during teardown; nothing to do then
                let _ = tx.send(ev);
            }
        }))
        .map_err(|e| ScrapeError::TabOperationFailed(format!("Failed to add network listener: {}", e)))?;

        Ok(Self { rx })
    }

    /// Discard events from before the upcoming action, so the next
    /// [`wait`](Self::wait) observes only activity the action triggers.
    /// Call this immediately before the click or scroll being waited on.
    pub fn begin_cycle(&self) {
        while self.rx.try_recv().is_ok() {}
    }

    /// Block until the page settles or `max_wait` elapses.
    ///
    /// Events buffered since the last [`begin_cycle`](Self::begin_cycle)
    /// are fed to the detector first: a request the action started before
    /// this call still counts as in flight.
    pub fn wait(&self, settle_delay: Duration, max_wait: Duration) {
        let mut detector = QuiescenceDetector::new(settle_delay, max_wait, Instant::now());
        loop {
            match self.rx.recv_timeout(POLL_INTERVAL) {
                Ok(event) => detector.observe(&event, Instant::now()),
                Err(RecvTimeoutError::Timeout) => {}
                // Listener dropped; keep pacing until the timeout path ends
                // the wait
                Err(RecvTimeoutError::Disconnected) => std::thread::sleep(POLL_INTERVAL),
            }
            if detector.poll(Instant::now()) {
                return;
            }
        }
    }

    #[cfg(test)]
    fn from_channel(rx: Receiver<NetworkEvent>) -> Self {
        Self { rx }
    }
}

/// Waiting strategy when network observation cannot be enabled: a fixed
/// short grace period on top of the settle delay, still bounded by max wait
pub fn fallback_wait(settle_delay: Duration, max_wait: Duration) {
    let wait = (settle_delay + FALLBACK_DELAY).min(max_wait);
    log::debug!("Network observation unavailable, sleeping {:?}", wait);
    std::thread::sleep(wait);
}

#[cfg(test)]
mod tests {
    use super::*;

    const D: Duration = Duration::from_millis(500);
    const M: Duration = Duration::from_secs(20);

    fn ms(base: Instant, millis: u64) -> Instant {
        base + Duration::from_millis(millis)
    }

    fn started(id: &str) -> NetworkEvent {
        NetworkEvent::RequestStarted(id.to_string())
    }

    fn finished(id: &str) -> NetworkEvent {
        NetworkEvent::RequestFinished(id.to_string())
    }

    #[test]
    fn test_settles_when_quiet() {
        let t0 = Instant::now();
        let mut detector = QuiescenceDetector::new(D, M, t0);

        detector.observe(&started("1"), ms(t0, 10));
        detector.observe(&finished("1"), ms(t0, 100));

        assert!(!detector.poll(ms(t0, 200)));
        assert!(detector.poll(ms(t0, 700)));
    }

    #[test]
    fn test_new_request_resets_debounce() {
        let t0 = Instant::now();
        let mut detector = QuiescenceDetector::new(D, M, t0);

        detector.observe(&started("1"), ms(t0, 10));
        detector.observe(&finished("1"), ms(t0, 100));
        detector.observe(&started("2"), ms(t0, 400));

        // Quiet window restarted at 400ms and request 2 is still in flight
        assert!(!detector.poll(ms(t0, 700)));

        detector.observe(&finished("2"), ms(t0, 800));
        assert!(!detector.poll(ms(t0, 850)));
        assert!(detector.poll(ms(t0, 950)));
    }

    #[test]
    fn test_inflight_blocks_settling() {
        let t0 = Instant::now();
        let mut detector = QuiescenceDetector::new(D, M, t0);

        detector.observe(&started("1"), ms(t0, 10));
        assert_eq!(detector.inflight(), 1);
        // Long quiet since the last start, but the request never finished
        assert!(!detector.poll(ms(t0, 5_000)));
    }

    #[test]
    fn test_max_wait_fires_despite_activity() {
        let t0 = Instant::now();
        let mut detector = QuiescenceDetector::new(D, M, t0);

        detector.observe(&started("poll"), ms(t0, 19_990));
        assert!(detector.poll(ms(t0, 20_000)));
    }

    #[test]
    fn test_fires_exactly_once() {
        let t0 = Instant::now();
        let mut detector = QuiescenceDetector::new(D, M, t0);

        // Both the debounce and timeout conditions are true here
        let fired: usize = (0..10)
            .map(|i| detector.poll(ms(t0, 25_000 + i)) as usize)
            .sum();
        assert_eq!(fired, 1);
    }

    #[test]
    fn test_idle_page_settles_after_delay() {
        let t0 = Instant::now();
        let mut detector = QuiescenceDetector::new(D, M, t0);

        assert!(!detector.poll(ms(t0, 100)));
        assert!(detector.poll(ms(t0, 500)));
    }

    #[test]
    fn test_wait_tracks_requests_started_before_it_runs() {
        let (tx, rx) = mpsc::channel();
        let watch = NetworkWatch::from_channel(rx);
        watch.begin_cycle();

        // The action fires a request in the gap before the wait starts;
        // it never finishes, so only the ceiling may end the wait
        tx.send(started("slow")).unwrap();

        let t0 = Instant::now();
        watch.wait(Duration::from_millis(50), Duration::from_millis(250));
        assert!(t0.elapsed() >= Duration::from_millis(250));
    }

    #[test]
    fn test_begin_cycle_discards_previous_activity() {
        let (tx, rx) = mpsc::channel();
        let watch = NetworkWatch::from_channel(rx);

        // In-flight leftovers from an earlier cycle must not strand the wait
        tx.send(started("earlier")).unwrap();
        watch.begin_cycle();

        let t0 = Instant::now();
        watch.wait(Duration::from_millis(50), Duration::from_secs(5));
        assert!(t0.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_disconnected_listener_still_settles() {
        let (tx, rx) = mpsc::channel::<NetworkEvent>();
        drop(tx);
        let watch = NetworkWatch::from_channel(rx);

        let t0 = Instant::now();
        watch.wait(Duration::from_millis(100), Duration::from_secs(5));
        let elapsed = t0.elapsed();
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_secs(2));
    }

    #[test]
    fn test_failed_request_counts_as_complete() {
        let t0 = Instant::now();
        let mut detector = QuiescenceDetector::new(D, M, t0);

        detector.observe(&started("1"), ms(t0, 10));
        detector.observe(&NetworkEvent::RequestFailed("1".to_string()), ms(t0, 50));

        assert!(detector.poll(ms(t0, 600)));
    }
}
