use anyhow::Result;
use std::time::Duration;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Tokio runtime paired with the run-wide cancellation token.
///
/// The crawl drives a single browser session sequentially, so one thread is
/// enough; the token is how an operator interrupt reaches the crawl loop.
pub struct TrawlRuntime {
    runtime: Runtime,
    cancel: CancellationToken,
}

impl TrawlRuntime {
    /// Build a current-thread runtime with timers and IO enabled.
    ///
    /// ```
    /// use trawl_runtime::TrawlRuntime;
    /// use std::time::Duration;
    ///
    /// let runtime = TrawlRuntime::build().expect("runtime builds");
    /// let value = runtime.block_on(async { 2 + 2 });
    /// assert_eq!(value, 4);
    /// runtime.shutdown(Duration::from_millis(10));
    /// ```
    pub fn build() -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            runtime,
            cancel: CancellationToken::new(),
        })
    }

    pub fn handle(&self) -> &Handle {
        self.runtime.handle()
    }

    /// Clone of the shared cancellation token.
    ///
    /// ```
    /// use trawl_runtime::TrawlRuntime;
    ///
    /// let runtime = TrawlRuntime::build().unwrap();
    /// let cancel = runtime.cancellation();
    /// assert!(!cancel.is_cancelled());
    /// cancel.cancel();
    /// assert!(runtime.cancellation().is_cancelled());
    /// ```
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the shared token on the first Ctrl-C.
    ///
    /// The listener stops quietly if the token is cancelled some other way.
    pub fn install_ctrl_c(&self) -> JoinHandle<()> {
        let cancel = self.cancel.clone();
        self.runtime.spawn(async move {
            tokio::select! {
                res = tokio::signal::ctrl_c() => match res {
                    Ok(()) => {
                        warn!(target: "trawl.runtime", "interrupt received; finishing current profile");
                        cancel.cancel();
                    }
                    Err(e) => warn!(target: "trawl.runtime", error = %e, "cannot listen for ctrl-c"),
                },
                _ = cancel.cancelled() => {}
            }
        })
    }

    pub fn block_on<F: std::future::Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }

    /// Cancel outstanding work and shut the runtime down.
    pub fn shutdown(self, graceful: Duration) {
        self.cancel.cancel();
        self.runtime.shutdown_timeout(graceful);
        info!(target: "trawl.runtime", "runtime stopped");
    }
}
