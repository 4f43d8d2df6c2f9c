use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// The operations the crawler and authenticator need from a browser.
///
/// A session is a single stateful resource: callers hold it by `&mut` and
/// never share it across concurrent work.
#[async_trait]
pub trait BrowserSession: Send {
    async fn goto(&mut self, url: &str) -> Result<()>;

    /// Wait up to `timeout` for `selector` to appear. `Ok(false)` on timeout.
    async fn wait_for_element(&mut self, selector: &str, timeout: Duration) -> Result<bool>;

    async fn execute(&mut self, script: &str) -> Result<serde_json::Value>;

    async fn page_source(&mut self) -> Result<String>;

    async fn current_url(&mut self) -> Result<String>;

    /// Send keystrokes to the first element matching `selector`.
    async fn send_keys(&mut self, selector: &str, text: &str) -> Result<()>;

    async fn click(&mut self, selector: &str) -> Result<()>;

    /// Release the session. Safe to call more than once.
    async fn close(&mut self) -> Result<()>;
}
