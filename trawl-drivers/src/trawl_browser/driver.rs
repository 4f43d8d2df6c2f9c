use crate::trawl_browser::{
    fingerprint::{UserAgentManager, UserAgentProfile},
    session::BrowserSession,
    stealth::{build_stealth_arguments, StealthScripts},
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use fantoccini::{error::CmdError, Client, ClientBuilder, Locator};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};
use trawl_common::{StealthLevel, TrawlError};
use webdriver::capabilities::Capabilities;

/// Everything that shapes the browser before launch. Fixed once built.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    headless: bool,
    stealth_level: StealthLevel,
    profile: UserAgentProfile,
    arguments: Vec<String>,
    post_launch_scripts: Vec<String>,
}

impl SessionConfig {
    /// Build a config with a freshly rotated user-agent profile.
    pub fn new(headless: bool, stealth_level: StealthLevel) -> Self {
        let profile = UserAgentManager::new().session_profile().clone();
        Self::with_profile(headless, stealth_level, profile)
    }

    pub fn with_profile(
        headless: bool,
        stealth_level: StealthLevel,
        profile: UserAgentProfile,
    ) -> Self {
        let arguments = build_stealth_arguments(stealth_level, &profile, headless);
        let post_launch_scripts = StealthScripts::for_level(stealth_level, &profile);
        Self {
            headless,
            stealth_level,
            profile,
            arguments,
            post_launch_scripts,
        }
    }

    pub fn headless(&self) -> bool {
        self.headless
    }

    pub fn stealth_level(&self) -> StealthLevel {
        self.stealth_level
    }

    pub fn user_agent(&self) -> &str {
        &self.profile.user_agent
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Scripts run right after launch and again after every navigation.
    pub fn post_launch_scripts(&self) -> &[String] {
        &self.post_launch_scripts
    }

    /// WebDriver capabilities with the automation switches suppressed.
    pub fn capabilities(&self) -> Capabilities {
        let mut caps = Capabilities::new();
        caps.insert(
            "goog:chromeOptions".to_string(),
            json!({
                "args": self.arguments,
                "excludeSwitches": ["enable-automation"],
                "useAutomationExtension": false,
            }),
        );
        caps
    }
}

/// Spawns the driver process and connects exactly one session to it.
#[derive(Debug, Clone)]
pub struct SessionBootstrapper {
    driver_path: PathBuf,
    startup_timeout: Duration,
}

impl SessionBootstrapper {
    pub fn new(driver_path: impl Into<PathBuf>, startup_timeout: Duration) -> Self {
        Self {
            driver_path: driver_path.into(),
            startup_timeout,
        }
    }

    /// Launch the driver, open a session, and mask the automation marker.
    pub async fn launch(&self, config: SessionConfig) -> Result<TrawlDriver, TrawlError> {
        let port = free_port().map_err(|e| TrawlError::SessionInit(e.to_string()))?;

        let mut process = detached_command(&self.driver_path)
            .arg(format!("--port={port}"))
            .spawn()
            .map_err(|e| {
                TrawlError::SessionInit(format!(
                    "failed to spawn {}: {e}",
                    self.driver_path.display()
                ))
            })?;
        debug!(target: "trawl.session", port, driver = %self.driver_path.display(), "driver process spawned");

        if let Err(e) = wait_for_port(port, self.startup_timeout).await {
            let _ = process.kill().await;
            return Err(TrawlError::SessionInit(e.to_string()));
        }

        let client = match ClientBuilder::native()
            .capabilities(config.capabilities())
            .connect(&format!("http://127.0.0.1:{port}"))
            .await
        {
            Ok(client) => client,
            Err(e) => {
                let _ = process.kill().await;
                return Err(TrawlError::SessionInit(format!(
                    "webdriver session refused: {e}"
                )));
            }
        };

        let mut driver = TrawlDriver {
            client,
            process,
            config,
            closed: false,
        };

        if let Err(e) = driver.apply_stealth().await {
            let _ = driver.close().await;
            return Err(TrawlError::SessionInit(format!(
                "post-launch script failed: {e}"
            )));
        }

        info!(
            target: "trawl.session",
            headless = driver.config.headless(),
            stealth = ?driver.config.stealth_level(),
            user_agent = driver.config.user_agent(),
            "browser session initialized"
        );
        Ok(driver)
    }
}

/// Command for a helper process that outlives terminal signals.
///
/// On unix the child leads its own process group, so a Ctrl-C at the
/// terminal reaches only this process and the crawl can wind down on its
/// own schedule. The child is still killed when its handle drops.
fn detached_command(program: &Path) -> Command {
    let mut cmd = Command::new(program);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);
    cmd
}

fn free_port() -> std::io::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

async fn wait_for_port(port: u16, timeout: Duration) -> Result<()> {
    tokio::time::timeout(timeout, async {
        loop {
            if TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    })
    .await
    .with_context(|| format!("driver did not listen on port {port} within {timeout:?}"))
}

/// A live `fantoccini` session plus the driver process backing it.
pub struct TrawlDriver {
    client: Client,
    process: Child,
    config: SessionConfig,
    closed: bool,
}

impl TrawlDriver {
    async fn apply_stealth(&mut self) -> Result<()> {
        for script in self.config.post_launch_scripts() {
            self.client.execute(script, vec![]).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for TrawlDriver {
    async fn goto(&mut self, url: &str) -> Result<()> {
        self.client.goto(url).await?;
        // a fresh document drops the previous overrides
        if let Err(e) = self.apply_stealth().await {
            warn!(target: "trawl.session", %url, error = %e, "stealth scripts failed after navigation");
        }
        Ok(())
    }

    async fn wait_for_element(&mut self, selector: &str, timeout: Duration) -> Result<bool> {
        match self
            .client
            .wait()
            .at_most(timeout)
            .for_element(Locator::Css(selector))
            .await
        {
            Ok(_) => Ok(true),
            Err(CmdError::WaitTimeout) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn execute(&mut self, script: &str) -> Result<serde_json::Value> {
        Ok(self.client.execute(script, vec![]).await?)
    }

    async fn page_source(&mut self) -> Result<String> {
        Ok(self.client.source().await?)
    }

    async fn current_url(&mut self) -> Result<String> {
        Ok(self.client.current_url().await?.to_string())
    }

    async fn send_keys(&mut self, selector: &str, text: &str) -> Result<()> {
        let element = self.client.find(Locator::Css(selector)).await?;
        element.send_keys(text).await?;
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<()> {
        let element = self.client.find(Locator::Css(selector)).await?;
        element.click().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let quit = self.client.clone().close().await;
        if let Err(e) = self.process.kill().await {
            debug!(target: "trawl.session", error = %e, "driver process already gone");
        }
        quit?;
        info!(target: "trawl.session", "browser closed");
        Ok(())
    }
}
