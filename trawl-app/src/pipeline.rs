use crate::cli::Cli;
use anyhow::Result;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use trawl_config::{CrawlSettings, TrawlConfig};
use trawl_crawl::{
    extract::FieldExtractor,
    orchestrator::{CrawlOrchestrator, CrawlPolicy},
    store::{ResultStore, RunSummary},
    target::{CrawlTarget, load_targets},
};
use trawl_drivers::trawl_browser::{
    auth::{Authenticator, Credentials, LoginCheck},
    download::DownloadProvisioner,
    driver::{SessionBootstrapper, SessionConfig},
    resolver::{CacheProvisioner, DriverProvisioner, DriverResolver},
    session::BrowserSession,
};

pub fn crawl_policy(settings: &CrawlSettings) -> CrawlPolicy {
    CrawlPolicy {
        politeness: settings.politeness_delay,
        settle: settings.settle_delay,
        between_targets: settings.between_targets_delay,
        page_timeout: Duration::from_secs(settings.page_timeout_secs),
        readiness_selector: settings.readiness_selector.clone(),
    }
}

/// Load targets, bring up a browser, crawl, and write the results.
///
/// Setup problems are logged and end the run with `Ok(None)`; only output
/// failures surface as errors.
pub async fn run(cli: &Cli, cfg: &TrawlConfig, cancel: CancellationToken) -> Result<Option<RunSummary>> {
    let targets = match load_targets(&cli.urls) {
        Ok(targets) if targets.is_empty() => {
            error!(target: "trawl", file = %cli.urls.display(), "no valid URLs to scrape");
            return Ok(None);
        }
        Ok(targets) => targets,
        Err(e) => {
            error!(target: "trawl", file = %cli.urls.display(), error = %e, "could not read URL list");
            return Ok(None);
        }
    };

    let resolver = DriverResolver::new(
        cfg.driver.executable_name.clone(),
        cfg.driver.exclusion_marker.clone(),
        cfg.driver.max_search_depth,
    );
    let provisioner = match driver_provisioner(cfg, &resolver) {
        Ok(p) => p,
        Err(e) => {
            error!(target: "trawl", error = %e, "failed to set up driver");
            return Ok(None);
        }
    };
    let driver_path = match resolver
        .resolve_with(cfg.driver.explicit_path.as_deref(), provisioner.as_ref())
        .await
    {
        Ok(path) => path,
        Err(e) => {
            error!(target: "trawl", error = %e, "failed to set up driver");
            return Ok(None);
        }
    };

    let bootstrapper = SessionBootstrapper::new(
        driver_path,
        Duration::from_secs(cfg.driver.startup_timeout_secs),
    );
    let session_config = SessionConfig::new(cfg.session.headless, cfg.session.stealth_level);
    let mut session = match bootstrapper.launch(session_config).await {
        Ok(session) => session,
        Err(e) => {
            error!(target: "trawl", error = %e, "failed to start browser session");
            return Ok(None);
        }
    };

    crawl_and_store(&mut session, &targets, cli, cfg, cancel).await
}

/// The local cache lookup, optionally backed by a download into that cache.
fn driver_provisioner(
    cfg: &TrawlConfig,
    resolver: &DriverResolver,
) -> trawl_common::Result<Box<dyn DriverProvisioner>> {
    let cache = CacheProvisioner::new(
        cfg.driver.install_root.clone(),
        cfg.driver.executable_name.clone(),
    );
    if !cfg.driver.auto_download {
        return Ok(Box::new(cache));
    }

    let mut download =
        DownloadProvisioner::new(cache, resolver.clone(), cfg.driver.executable_name.clone())?;
    if let Some(root) = &cfg.driver.install_root {
        download = download.with_cache_root(root);
    }
    if let Some(url) = &cfg.driver.index_url {
        download = download.with_index_url(url);
    }
    Ok(Box::new(download))
}

/// Everything after the session exists. The session is closed whatever the
/// crawl outcome, before results are written.
pub async fn crawl_and_store(
    session: &mut dyn BrowserSession,
    targets: &[CrawlTarget],
    cli: &Cli,
    cfg: &TrawlConfig,
    cancel: CancellationToken,
) -> Result<Option<RunSummary>> {
    if cli.login {
        sign_in(session, cfg).await;
    }

    let orchestrator =
        CrawlOrchestrator::new(crawl_policy(&cfg.crawl), FieldExtractor::profile(), cancel);
    let run = orchestrator.run(session, targets).await;

    if let Err(e) = session.close().await {
        warn!(target: "trawl", error = %e, "browser did not close cleanly");
    }

    Ok(ResultStore::new(&cli.output).finalize(&run)?)
}

async fn sign_in(session: &mut dyn BrowserSession, cfg: &TrawlConfig) {
    let check = LoginCheck::new(cfg.auth.checkpoint_marker.clone());
    let mut authenticator = match Authenticator::new(&cfg.auth.login_url, check) {
        Ok(a) => a,
        Err(e) => {
            warn!(target: "trawl", error = %e, "login skipped");
            return;
        }
    };
    let credentials = Credentials::resolve(cfg.auth.email.clone(), cfg.auth.password.clone());
    let state = authenticator.authenticate(session, credentials).await;
    info!(target: "trawl", ?state, "login step finished");
}
