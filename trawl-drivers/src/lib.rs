//! Driver layer for browser automation.
//!
//! This crate finds a usable driver executable, launches one stealthy
//! browser session on top of it, and offers the optional sign-in step that
//! runs before a crawl.
//!
//! - [`trawl_browser::resolver::DriverResolver`]: driver executable discovery
//! - [`trawl_browser::download::DownloadProvisioner`]: fills the driver cache on first use
//! - [`trawl_browser::driver::SessionBootstrapper`]: launches a [`trawl_browser::driver::TrawlDriver`]
//! - [`trawl_browser::session::BrowserSession`]: the seam the crawler drives
//! - [`trawl_browser::auth::Authenticator`]: best-effort credentialed sign-in
//! - [`trawl_browser::behavioral::BehavioralEngine`]: human-like timings and typing
//! - [`trawl_browser::stealth`]: browser arguments and JS evasions
pub mod trawl_browser;
