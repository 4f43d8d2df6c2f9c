use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use trawl_common::DelayRange;
use trawl_crawl::orchestrator::CrawlPolicy;
use trawl_drivers::trawl_browser::session::BrowserSession;

/// How a fake page behaves when visited.
#[derive(Clone)]
pub enum Page {
    Ready(String),
    NeverReady,
    Unreachable,
}

/// In-memory browser serving canned pages by URL.
#[derive(Default)]
pub struct FakeBrowser {
    pages: HashMap<String, Page>,
    current: Option<String>,
    pub visited: Vec<String>,
    pub scripts: Vec<String>,
    pub closed: bool,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, page: Page) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    /// Fire `token` once the `n`th navigation has been served.
    pub fn cancel_after(mut self, n: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((n, token));
        self
    }

    fn current_page(&self) -> Option<&Page> {
        self.current.as_ref().and_then(|url| self.pages.get(url))
    }
}

#[async_trait]
impl BrowserSession for FakeBrowser {
    async fn goto(&mut self, url: &str) -> Result<()> {
        self.visited.push(url.to_string());
        if let Some((n, token)) = &self.cancel_after {
            if self.visited.len() >= *n {
                token.cancel();
            }
        }
        match self.pages.get(url) {
            Some(Page::Unreachable) | None => Err(anyhow!("net::ERR_NAME_NOT_RESOLVED")),
            Some(_) => {
                self.current = Some(url.to_string());
                Ok(())
            }
        }
    }

    async fn wait_for_element(&mut self, _selector: &str, _timeout: Duration) -> Result<bool> {
        Ok(matches!(self.current_page(), Some(Page::Ready(_))))
    }

    async fn execute(&mut self, script: &str) -> Result<serde_json::Value> {
        self.scripts.push(script.to_string());
        Ok(serde_json::Value::Null)
    }

    async fn page_source(&mut self) -> Result<String> {
        match self.current_page() {
            Some(Page::Ready(html)) => Ok(html.clone()),
            _ => Err(anyhow!("no document")),
        }
    }

    async fn current_url(&mut self) -> Result<String> {
        Ok(self.current.clone().unwrap_or_default())
    }

    async fn send_keys(&mut self, _selector: &str, _text: &str) -> Result<()> {
        Ok(())
    }

    async fn click(&mut self, _selector: &str) -> Result<()> {
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

pub fn profile_html(name: &str, headline: &str) -> String {
    format!(
        r#"<html><body>
            <h1 class="text-heading-xlarge">{name}</h1>
            <div class="text-body-medium break-words">{headline}</div>
            <span class="text-body-small inline t-black--light break-words">Lisbon, Portugal</span>
        </body></html>"#
    )
}

pub fn instant_policy() -> CrawlPolicy {
    CrawlPolicy {
        politeness: DelayRange::zero(),
        settle: DelayRange::zero(),
        between_targets: DelayRange::zero(),
        page_timeout: Duration::from_millis(50),
        readiness_selector: "body".into(),
    }
}
