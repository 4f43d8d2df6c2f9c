use crate::extract::FieldExtractor;
use crate::record::{CrawlRun, ProfileRecord};
use crate::target::CrawlTarget;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use trawl_common::{DelayRange, Result, TrawlError};
use trawl_drivers::trawl_browser::{behavioral::BehavioralEngine, session::BrowserSession};

/// Scrolls halfway down so lazily loaded sections render.
pub const SCROLL_TO_MIDPOINT: &str = "window.scrollTo(0, document.body.scrollHeight/2);";

/// Timing and readiness policy for one crawl.
#[derive(Debug, Clone)]
pub struct CrawlPolicy {
    /// Pause after navigation, before touching the page.
    pub politeness: DelayRange,
    /// Pause after scrolling, for lazy content.
    pub settle: DelayRange,
    /// Pause between consecutive targets.
    pub between_targets: DelayRange,
    pub page_timeout: Duration,
    /// Element whose presence counts as "page ready".
    pub readiness_selector: String,
}

impl Default for CrawlPolicy {
    fn default() -> Self {
        Self {
            politeness: DelayRange::from_secs(3, 6),
            settle: DelayRange::from_secs(1, 2),
            between_targets: DelayRange::from_secs(2, 6),
            page_timeout: Duration::from_secs(10),
            readiness_selector: "body".into(),
        }
    }
}

/// Drives the sequential visit/extract loop over one browser session.
pub struct CrawlOrchestrator {
    policy: CrawlPolicy,
    extractor: FieldExtractor,
    behavioral_engine: BehavioralEngine,
    cancel: CancellationToken,
}

impl CrawlOrchestrator {
    pub fn new(policy: CrawlPolicy, extractor: FieldExtractor, cancel: CancellationToken) -> Self {
        Self {
            policy,
            extractor,
            behavioral_engine: BehavioralEngine::new(),
            cancel,
        }
    }

    /// Visit every target in order and collect what could be extracted.
    ///
    /// Per-target failures are logged and skipped. Cancellation is checked
    /// between targets; whatever was collected so far is returned.
    pub async fn run(&self, session: &mut dyn BrowserSession, targets: &[CrawlTarget]) -> CrawlRun {
        let mut run = CrawlRun::new();
        let total = targets.len();
        info!(target: "trawl.crawl", total, "starting crawl");

        for (idx, target) in targets.iter().enumerate() {
            if self.cancel.is_cancelled() {
                run.mark_interrupted();
                break;
            }

            info!(target: "trawl.crawl", "Processing profile {}/{}", idx + 1, total);
            run.begin_target();
            match self.crawl_one(session, target).await {
                Ok(record) => run.append(record),
                Err(e @ TrawlError::NavigationTimeout { .. }) => {
                    warn!(target: "trawl.crawl", url = %target, error = %e, "page never became ready; skipping");
                }
                Err(e) => {
                    warn!(target: "trawl.crawl", url = %target, error = %e, "error scraping profile; skipping");
                }
            }

            if self.cancel.is_cancelled() {
                run.mark_interrupted();
                break;
            }

            if idx + 1 < total {
                let delay = self.policy.between_targets.sample();
                info!(
                    target: "trawl.crawl",
                    "Waiting {:.1} seconds before next profile...",
                    delay.as_secs_f64()
                );
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = self.cancel.cancelled() => {
                        run.mark_interrupted();
                        break;
                    }
                }
            }
        }

        if run.interrupted() {
            info!(
                target: "trawl.crawl",
                attempted = run.attempted(),
                collected = run.succeeded(),
                "crawl interrupted by user"
            );
        } else {
            info!(
                target: "trawl.crawl",
                attempted = run.attempted(),
                collected = run.succeeded(),
                "crawl finished"
            );
        }
        run
    }

    async fn crawl_one(
        &self,
        session: &mut dyn BrowserSession,
        target: &CrawlTarget,
    ) -> Result<ProfileRecord> {
        let url = target.url();
        info!(target: "trawl.crawl", %url, "Scraping profile");
        session.goto(url).await?;

        self.behavioral_engine.pause(self.policy.politeness).await;

        let ready = session
            .wait_for_element(&self.policy.readiness_selector, self.policy.page_timeout)
            .await?;
        if !ready {
            return Err(TrawlError::NavigationTimeout {
                url: url.to_string(),
                timeout: self.policy.page_timeout,
            });
        }

        session.execute(SCROLL_TO_MIDPOINT).await?;
        self.behavioral_engine.pause(self.policy.settle).await;

        let html = session.page_source().await?;
        Ok(self.extractor.extract(url, &html))
    }
}
