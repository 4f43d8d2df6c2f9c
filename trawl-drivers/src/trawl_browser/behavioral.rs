use super::session::BrowserSession;
use anyhow::Result;
use std::time::Duration;
use tokio::time::sleep;
use trawl_common::DelayRange;

/// Gap between simulated keystrokes.
pub const KEYSTROKE_DELAY: DelayRange = DelayRange {
    min_ms: 30,
    max_ms: 150,
};

#[derive(Debug, Clone, Default)]
/// Produces human-like delays and typing behavior to reduce automation signals.
pub struct BehavioralEngine {}

impl BehavioralEngine {
    pub fn new() -> Self {
        Self {}
    }

    /// Sleep for a duration drawn from `range` and return what was slept.
    pub async fn pause(&self, range: DelayRange) -> Duration {
        let d = range.sample();
        if !d.is_zero() {
            sleep(d).await;
        }
        d
    }

    /// Type `text` into `selector` one character at a time, pausing for a
    /// draw from `gap` after each keystroke.
    pub async fn type_text_human_like(
        &self,
        session: &mut dyn BrowserSession,
        selector: &str,
        text: &str,
        gap: DelayRange,
    ) -> Result<()> {
        for ch in text.chars() {
            session.send_keys(selector, &ch.to_string()).await?;
            self.pause(gap).await;
        }
        Ok(())
    }
}
