//! Process-wide `tracing` setup.
//!
//! Every run writes to `<dir>/<app>.log` and, unless told otherwise, echoes
//! the same events on stdout. The first [`init_logging`] call wins; later
//! calls get the path chosen by the first one.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};
use tracing_subscriber::{EnvFilter, Layer, Registry};

const LOG_DIR_ENV: &str = "TRAWL_LOG_DIR";

/// Keeps the background writer alive and remembers where it writes.
struct Installed {
    path: PathBuf,
    _guard: WorkerGuard,
}

static INSTALLED: OnceLock<Installed> = OnceLock::new();

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Output encoding for structured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

impl LogFormat {
    fn layer<W>(self, writer: W, ansi: bool) -> BoxedLayer
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let base = fmt::layer().with_writer(writer).with_ansi(ansi);
        match self {
            LogFormat::Text => base.boxed(),
            LogFormat::Json => base.json().boxed(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// File stem of the log file.
    pub app_name: &'static str,
    /// Wins over `TRAWL_LOG_DIR`; the working directory is the last resort.
    pub log_dir: Option<PathBuf>,
    pub emit_console: bool,
    pub format: LogFormat,
    /// Used when `RUST_LOG` is unset or unparsable.
    pub default_filter: &'static str,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            app_name: "trawl",
            log_dir: None,
            emit_console: true,
            format: LogFormat::Text,
            default_filter: "info",
        }
    }
}

impl LogConfig {
    fn directory(&self) -> PathBuf {
        self.log_dir
            .clone()
            .or_else(|| std::env::var_os(LOG_DIR_ENV).map(PathBuf::from))
            .map(|dir| expand_home(&dir))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn file_name(&self) -> String {
        format!("{}.log", self.app_name)
    }
}

/// Install the global subscriber and return the log file path.
pub fn init_logging(config: LogConfig) -> anyhow::Result<PathBuf> {
    if let Some(installed) = INSTALLED.get() {
        return Ok(installed.path.clone());
    }

    let dir = config.directory();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("cannot create log directory {}", dir.display()))?;
    let file_name = config.file_name();
    let path = dir.join(&file_name);

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(&dir, &file_name));

    let mut layers: Vec<BoxedLayer> = vec![config.format.layer(file_writer, false)];
    if config.emit_console {
        layers.push(config.format.layer(std::io::stdout, true));
    }
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_filter));

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("tracing setup failed: {e}"))?;

    let installed = INSTALLED.get_or_init(|| Installed {
        path,
        _guard: guard,
    });
    Ok(installed.path.clone())
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    }
}
