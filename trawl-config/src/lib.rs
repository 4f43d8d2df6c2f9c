//! Loader for crawl configuration with YAML + environment overlays.
//!
//! Precedence, lowest first: built-in defaults, an optional YAML file, then
//! `TRAWL__`-prefixed environment variables (`__` separates nesting levels,
//! e.g. `TRAWL__CRAWL__PAGE_TIMEOUT_SECS=20`). String values may reference
//! other environment variables as `${VAR}`; those are expanded after merging.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use trawl_common::{DelayRange, StealthLevel, TrawlError};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TrawlConfig {
    pub driver: DriverSettings,
    pub session: SessionSettings,
    pub crawl: CrawlSettings,
    pub auth: AuthSettings,
}

/// Where and how to look for the driver executable.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DriverSettings {
    /// Preferred executable; wins over every discovery strategy when valid.
    pub explicit_path: Option<PathBuf>,
    /// Install location handed out by the provisioner, if known up front.
    pub install_root: Option<PathBuf>,
    pub executable_name: String,
    /// Paths containing this marker are companion files, never executables.
    pub exclusion_marker: String,
    pub max_search_depth: usize,
    pub startup_timeout_secs: u64,
    /// Download a driver into the cache when none is found locally.
    pub auto_download: bool,
    /// Override for the known-good versions index.
    pub index_url: Option<String>,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            explicit_path: None,
            install_root: None,
            executable_name: default_executable_name(),
            exclusion_marker: "THIRD_PARTY".into(),
            max_search_depth: 6,
            startup_timeout_secs: 10,
            auto_download: true,
            index_url: None,
        }
    }
}

fn default_executable_name() -> String {
    if cfg!(windows) {
        "chromedriver.exe".into()
    } else {
        "chromedriver".into()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub headless: bool,
    pub stealth_level: StealthLevel,
}

/// Politeness policy and readiness heuristics for the crawl loop.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlSettings {
    pub politeness_delay: DelayRange,
    pub settle_delay: DelayRange,
    pub between_targets_delay: DelayRange,
    pub page_timeout_secs: u64,
    pub readiness_selector: String,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            politeness_delay: DelayRange::from_secs(3, 6),
            settle_delay: DelayRange::from_secs(1, 2),
            between_targets_delay: DelayRange::from_secs(2, 6),
            page_timeout_secs: 10,
            readiness_selector: "body".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub login_url: String,
    pub checkpoint_marker: String,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            login_url: "https://www.linkedin.com/login".into(),
            checkpoint_marker: "checkpoint".into(),
            email: None,
            password: None,
        }
    }
}

impl TrawlConfig {
    /// Reject settings that would make the run misbehave rather than fail.
    pub fn validate(&self) -> Result<(), TrawlError> {
        if self.driver.executable_name.trim().is_empty() {
            return Err(TrawlError::Config("driver.executable_name is empty".into()));
        }
        if self.driver.exclusion_marker.is_empty() {
            return Err(TrawlError::Config("driver.exclusion_marker is empty".into()));
        }
        if self.crawl.page_timeout_secs == 0 {
            return Err(TrawlError::Config(
                "crawl.page_timeout_secs must be positive".into(),
            ));
        }
        if self.crawl.readiness_selector.trim().is_empty() {
            return Err(TrawlError::Config("crawl.readiness_selector is empty".into()));
        }
        Ok(())
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hiding the `config` crate wiring (YAML + env overrides).
pub struct TrawlConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    env: Environment,
}

impl Default for TrawlConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TrawlConfigLoader {
    /// Start from defaults with `TRAWL__` environment overrides.
    ///
    /// ```
    /// use trawl_config::TrawlConfigLoader;
    ///
    /// let config = TrawlConfigLoader::new()
    ///     .with_yaml_str("crawl:\n  page_timeout_secs: 25")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.crawl.page_timeout_secs, 25);
    /// assert_eq!(config.driver.exclusion_marker, "THIRD_PARTY");
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
            env: Environment::with_prefix("TRAWL").separator("__"),
        }
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is silently skipped when it does not exist.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources.
    ///
    /// Environment overrides are applied last, then `${VAR}` placeholders are
    /// expanded before the typed structs are materialised. Env values stay
    /// strings until then; the typed pass coerces them per field, so a numeric
    /// password is still a password.
    pub fn load(self) -> Result<TrawlConfig, ConfigError> {
        let cfg = self.builder.add_source(self.env).build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        Config::try_from(&v)?.try_deserialize()
    }
}
