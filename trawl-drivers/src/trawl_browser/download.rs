//! Fetches a driver build from the public Chrome for Testing index when no
//! usable driver is cached locally.
//!
//! Downloads unpack into `<cache_root>/<platform>/<version>/`, which keeps
//! the archive's own layout (`chromedriver-<platform>/chromedriver` plus its
//! notices). The resolver finds the binary there through its known
//! sub-paths, and finds it again on later runs by walking the cache root.

use crate::trawl_browser::resolver::{CacheProvisioner, DriverProvisioner, DriverResolver};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use trawl_common::TrawlError;

pub const KNOWN_GOOD_VERSIONS_URL: &str =
    "https://googlechromelabs.github.io/chrome-for-testing/last-known-good-versions-with-downloads.json";

#[derive(Debug, Deserialize)]
struct KnownGoodVersions {
    channels: Channels,
}

#[derive(Debug, Deserialize)]
struct Channels {
    #[serde(rename = "Stable")]
    stable: Option<Channel>,
    #[serde(rename = "Beta")]
    beta: Option<Channel>,
    #[serde(rename = "Dev")]
    dev: Option<Channel>,
    #[serde(rename = "Canary")]
    canary: Option<Channel>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    version: String,
    downloads: Downloads,
}

#[derive(Debug, Deserialize)]
struct Downloads {
    #[serde(default)]
    chromedriver: Vec<Asset>,
}

#[derive(Debug, Deserialize)]
struct Asset {
    platform: String,
    url: String,
}

/// One downloadable driver archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverRelease {
    pub version: String,
    pub url: String,
}

/// Index platform name for the running OS and CPU.
pub fn chromedriver_platform() -> Option<&'static str> {
    match (std::env::consts::OS, std::env::consts::ARCH) {
        ("macos", "aarch64") => Some("mac-arm64"),
        ("macos", "x86_64") => Some("mac-x64"),
        ("linux", "x86_64") => Some("linux64"),
        ("windows", "x86_64") => Some("win64"),
        ("windows", "x86") => Some("win32"),
        _ => None,
    }
}

/// First channel, most stable first, that ships a driver for `platform`.
pub fn pick_release(index_json: &str, platform: &str) -> Result<DriverRelease> {
    let index: KnownGoodVersions =
        serde_json::from_str(index_json).context("driver index is not valid JSON")?;
    let Channels {
        stable,
        beta,
        dev,
        canary,
    } = index.channels;

    [stable, beta, dev, canary]
        .into_iter()
        .flatten()
        .find_map(|channel| {
            let asset = channel
                .downloads
                .chromedriver
                .into_iter()
                .find(|a| a.platform == platform)?;
            Some(DriverRelease {
                version: channel.version,
                url: asset.url,
            })
        })
        .ok_or_else(|| anyhow!("no driver build for platform {platform}"))
}

/// Unpack a driver archive into `dest` and return the driver's path.
///
/// Entries that would land outside `dest` are skipped. If the archive holds
/// no `executable_name`, `dest` is removed again.
pub fn unpack(archive_bytes: &[u8], dest: &Path, executable_name: &str) -> Result<PathBuf> {
    let outcome = unpack_into(archive_bytes, dest, executable_name);
    if outcome.is_err() {
        let _ = std::fs::remove_dir_all(dest);
    }
    outcome
}

fn unpack_into(archive_bytes: &[u8], dest: &Path, executable_name: &str) -> Result<PathBuf> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(archive_bytes)).context("driver archive is not a zip")?;
    std::fs::create_dir_all(dest)
        .with_context(|| format!("cannot create {}", dest.display()))?;

    let mut driver = None;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            debug!(target: "trawl.download", name = entry.name(), "skipping unsafe archive entry");
            continue;
        };
        let out_path = dest.join(relative);
        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = std::fs::File::create(&out_path)
            .with_context(|| format!("cannot write {}", out_path.display()))?;
        std::io::copy(&mut entry, &mut out)?;

        if out_path.file_name().and_then(|n| n.to_str()) == Some(executable_name) {
            mark_executable(&out_path)?;
            driver = Some(out_path);
        }
    }

    driver.ok_or_else(|| anyhow!("{executable_name} not found in archive"))
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Versions become directory names, so they must be a single plain component.
fn safe_version(version: &str) -> Result<&str> {
    let ok = !version.is_empty()
        && version
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
        && version != "."
        && version != "..";
    if ok {
        Ok(version)
    } else {
        bail!("refusing driver version {version:?}")
    }
}

/// Uses the local cache when it holds a valid driver, otherwise downloads
/// the newest known-good build into it.
pub struct DownloadProvisioner {
    cache: CacheProvisioner,
    resolver: DriverResolver,
    executable_name: String,
    cache_root: Option<PathBuf>,
    index_url: String,
    platform: Option<String>,
    client: reqwest::Client,
}

impl DownloadProvisioner {
    pub fn new(
        cache: CacheProvisioner,
        resolver: DriverResolver,
        executable_name: impl Into<String>,
    ) -> trawl_common::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| TrawlError::Driver(anyhow!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            cache,
            resolver,
            executable_name: executable_name.into(),
            cache_root: CacheProvisioner::default_cache_root(),
            index_url: KNOWN_GOOD_VERSIONS_URL.to_string(),
            platform: chromedriver_platform().map(String::from),
            client,
        })
    }

    pub fn with_index_url(mut self, url: impl Into<String>) -> Self {
        self.index_url = url.into();
        self
    }

    pub fn with_cache_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.cache_root = Some(root.into());
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// Fetch, unpack, and return the directory the driver landed in.
    pub async fn download(&self) -> Result<PathBuf> {
        let platform = self
            .platform
            .as_deref()
            .ok_or_else(|| anyhow!("no driver builds for this OS and CPU"))?;
        let root = self
            .cache_root
            .as_deref()
            .ok_or_else(|| anyhow!("no cache directory to download into"))?;

        let index = self
            .client
            .get(&self.index_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let release = pick_release(&index, platform)?;
        let dest = root.join(platform).join(safe_version(&release.version)?);
        info!(
            target: "trawl.download",
            version = %release.version,
            platform,
            url = %release.url,
            "downloading driver"
        );

        let archive = self
            .client
            .get(&release.url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let name = self.executable_name.clone();
        let unpack_dest = dest.clone();
        let driver =
            tokio::task::spawn_blocking(move || unpack(&archive, &unpack_dest, &name)).await??;
        info!(target: "trawl.download", path = %driver.display(), "driver unpacked");
        Ok(dest)
    }
}

#[async_trait]
impl DriverProvisioner for DownloadProvisioner {
    async fn install_path(&self) -> Option<PathBuf> {
        let cached = self.cache.install_path().await;
        if let Some(found) = cached
            .as_deref()
            .and_then(|p| self.resolver.resolve(None, Some(p)).ok())
        {
            return Some(found);
        }

        match self.download().await {
            Ok(dir) => Some(dir),
            Err(e) => {
                warn!(target: "trawl.download", error = %e, "driver download failed");
                cached
            }
        }
    }
}
