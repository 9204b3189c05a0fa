//! Browser session management
//!
//! Launching or connecting to Chrome/Chromium over the Chrome DevTools
//! Protocol, active-tab discovery and JavaScript evaluation helpers.

pub mod config;
pub mod session;

pub use config::{ConnectionOptions, LaunchOptions};
pub use session::BrowserSession;
