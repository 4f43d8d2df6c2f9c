use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use trawl_common::{Result, TrawlError};

/// Sub-directories driver archives unpack into, one per platform/CPU naming
/// convention. Checked in this order under each search root.
const PLATFORM_DIRS: &[&str] = &[
    "chromedriver-mac-arm64",
    "chromedriver-mac-x64",
    "chromedriver-linux64",
    "chromedriver-win64",
    "chromedriver-win32",
];

/// Hands out the location an automatic driver install lives at, if any.
#[async_trait]
pub trait DriverProvisioner: Send + Sync {
    async fn install_path(&self) -> Option<PathBuf>;
}

/// Looks in the configured install root, then the conventional
/// `~/.wdm/drivers/chromedriver` cache, then `PATH`.
#[derive(Debug, Clone)]
pub struct CacheProvisioner {
    install_root: Option<PathBuf>,
    executable_name: String,
}

impl CacheProvisioner {
    pub fn new(install_root: Option<PathBuf>, executable_name: impl Into<String>) -> Self {
        Self {
            install_root,
            executable_name: executable_name.into(),
        }
    }

    /// `~/.wdm/drivers/chromedriver`, whether or not it exists yet.
    pub fn default_cache_root() -> Option<PathBuf> {
        Some(
            dirs::home_dir()?
                .join(".wdm")
                .join("drivers")
                .join("chromedriver"),
        )
    }

    fn cache_dir() -> Option<PathBuf> {
        Self::default_cache_root().filter(|dir| dir.is_dir())
    }

    fn on_path(&self) -> Option<PathBuf> {
        let path = std::env::var_os("PATH")?;
        std::env::split_paths(&path)
            .map(|dir| dir.join(&self.executable_name))
            .find(|candidate| candidate.is_file())
    }
}

#[async_trait]
impl DriverProvisioner for CacheProvisioner {
    async fn install_path(&self) -> Option<PathBuf> {
        self.install_root
            .clone()
            .or_else(Self::cache_dir)
            .or_else(|| self.on_path())
    }
}

/// One step of the discovery order. Cheap, explicit strategies come first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryStrategy {
    Explicit(PathBuf),
    InstallPath(PathBuf),
    KnownSubpaths(Vec<PathBuf>),
    RecursiveWalk(Vec<PathBuf>),
}

/// Finds a driver executable that is a regular, executable file and is not
/// one of the companion artifacts shipped next to it.
#[derive(Debug, Clone)]
pub struct DriverResolver {
    executable_name: String,
    exclusion_marker: String,
    max_depth: usize,
}

impl DriverResolver {
    pub fn new(
        executable_name: impl Into<String>,
        exclusion_marker: impl Into<String>,
        max_depth: usize,
    ) -> Self {
        Self {
            executable_name: executable_name.into(),
            exclusion_marker: exclusion_marker.into(),
            max_depth,
        }
    }

    /// The validity predicate every accepted path satisfies.
    pub fn is_valid(&self, path: &Path) -> bool {
        !path.to_string_lossy().contains(&self.exclusion_marker)
            && path.is_file()
            && is_executable(path)
    }

    /// Directory the install path points into: the path itself for a
    /// directory, its parent for a file, its grandparent otherwise.
    pub fn search_root(install: &Path) -> PathBuf {
        if install.is_dir() {
            install.to_path_buf()
        } else if install.is_file() {
            install
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| install.to_path_buf())
        } else {
            install
                .parent()
                .and_then(Path::parent)
                .map(Path::to_path_buf)
                .unwrap_or_else(|| install.to_path_buf())
        }
    }

    /// The root plus its parent, without duplicates.
    pub fn search_roots(install: &Path) -> Vec<PathBuf> {
        let root = Self::search_root(install);
        let mut roots = vec![root.clone()];
        if let Some(parent) = root.parent().filter(|p| !p.as_os_str().is_empty()) {
            if parent != root {
                roots.push(parent.to_path_buf());
            }
        }
        roots
    }

    /// Fixed candidate list under each root, in priority order.
    pub fn known_subpaths(&self, roots: &[PathBuf]) -> Vec<PathBuf> {
        roots
            .iter()
            .flat_map(|root| {
                std::iter::once(root.join(&self.executable_name)).chain(
                    PLATFORM_DIRS
                        .iter()
                        .map(move |dir| root.join(dir).join(&self.executable_name)),
                )
            })
            .collect()
    }

    /// The ordered discovery plan for the given inputs.
    pub fn strategies(
        &self,
        explicit: Option<&Path>,
        install: Option<&Path>,
    ) -> Vec<DiscoveryStrategy> {
        let mut plan = Vec::new();
        if let Some(p) = explicit {
            plan.push(DiscoveryStrategy::Explicit(p.to_path_buf()));
        }
        if let Some(install) = install {
            let roots = Self::search_roots(install);
            plan.push(DiscoveryStrategy::InstallPath(install.to_path_buf()));
            plan.push(DiscoveryStrategy::KnownSubpaths(self.known_subpaths(&roots)));
            plan.push(DiscoveryStrategy::RecursiveWalk(roots));
        }
        plan
    }

    /// Walk the strategies in order and stop at the first valid executable.
    pub fn resolve(&self, explicit: Option<&Path>, install: Option<&Path>) -> Result<PathBuf> {
        let plan = self.strategies(explicit, install);
        let mut roots: Vec<PathBuf> = Vec::new();

        for strategy in &plan {
            if let DiscoveryStrategy::RecursiveWalk(r) = strategy {
                roots.extend(r.iter().cloned());
            }
            if let Some(found) = self.evaluate(strategy) {
                info!(
                    target: "trawl.resolver",
                    path = %found.display(),
                    strategy = strategy_name(strategy),
                    "resolved driver executable"
                );
                return Ok(found);
            }
            debug!(
                target: "trawl.resolver",
                strategy = strategy_name(strategy),
                "strategy produced no valid driver"
            );
        }

        if roots.is_empty() {
            if let Some(p) = explicit {
                roots.push(p.to_path_buf());
            }
        }
        warn!(target: "trawl.resolver", ?roots, "driver resolution exhausted");
        Err(TrawlError::DriverResolution { roots })
    }

    /// Like [`resolve`](Self::resolve), but only asks the provisioner for an
    /// install path when the explicit path is not already usable.
    pub async fn resolve_with(
        &self,
        explicit: Option<&Path>,
        provisioner: &dyn DriverProvisioner,
    ) -> Result<PathBuf> {
        if let Some(p) = explicit.filter(|p| self.is_valid(p)) {
            info!(target: "trawl.resolver", path = %p.display(), strategy = "explicit", "resolved driver executable");
            return Ok(p.to_path_buf());
        }
        let install = provisioner.install_path().await;
        self.resolve(explicit, install.as_deref())
    }

    fn evaluate(&self, strategy: &DiscoveryStrategy) -> Option<PathBuf> {
        match strategy {
            DiscoveryStrategy::Explicit(p) | DiscoveryStrategy::InstallPath(p) => {
                self.is_valid(p).then(|| p.clone())
            }
            DiscoveryStrategy::KnownSubpaths(candidates) => {
                candidates.iter().find(|p| self.is_valid(p)).cloned()
            }
            DiscoveryStrategy::RecursiveWalk(roots) => roots
                .iter()
                .filter(|r| r.is_dir())
                .find_map(|r| self.walk(r, self.max_depth)),
        }
    }

    /// Depth-first, listing order: files of a directory before its children.
    fn walk(&self, dir: &Path, depth_left: usize) -> Option<PathBuf> {
        if dir.to_string_lossy().contains(&self.exclusion_marker) {
            return None;
        }
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(target: "trawl.resolver", dir = %dir.display(), error = %e, "skipping unreadable directory");
                return None;
            }
        };

        let mut subdirs = Vec::new();
        for entry in entries.flatten() {
            let Ok(kind) = entry.file_type() else { continue };
            let path = entry.path();
            if kind.is_dir() {
                subdirs.push(path);
            } else if entry.file_name().to_str() == Some(self.executable_name.as_str())
                && self.is_valid(&path)
            {
                return Some(path);
            }
        }

        if depth_left == 0 {
            return None;
        }
        subdirs
            .iter()
            .find_map(|sub| self.walk(sub, depth_left - 1))
    }
}

fn strategy_name(strategy: &DiscoveryStrategy) -> &'static str {
    match strategy {
        DiscoveryStrategy::Explicit(_) => "explicit",
        DiscoveryStrategy::InstallPath(_) => "install_path",
        DiscoveryStrategy::KnownSubpaths(_) => "known_subpaths",
        DiscoveryStrategy::RecursiveWalk(_) => "recursive_walk",
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("exe"))
        .unwrap_or(false)
}
