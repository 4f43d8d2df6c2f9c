//! Profile crawling: target loading, field extraction, the sequential crawl
//! loop, and tabular export.
//!
//! - [`target`]: `CrawlTarget` and URL list loading
//! - [`extract`]: fallback-chain field extraction from page markup
//! - [`record`]: `ProfileRecord` and the run accumulator `CrawlRun`
//! - [`orchestrator`]: navigate, wait, extract, delay, repeat
//! - [`store`]: CSV export and the run summary

pub mod extract;
pub mod orchestrator;
pub mod record;
pub mod store;
pub mod target;
