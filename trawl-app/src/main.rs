use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::time::Duration;
use tracing::info;
use trawl_common::observability::{LogConfig, init_logging};
use trawl_runtime::TrawlRuntime;

use cli::Cli;
mod cli;
mod pipeline;

fn main() -> Result<()> {
    // before parsing, so CHROME_DRIVER_PATH and friends can live in .env
    let env_file = cli::load_env_file(Path::new(cli::ENV_FILE));
    let cli = Cli::parse();

    let log_path = init_logging(LogConfig {
        log_dir: cli.log_dir.clone(),
        format: cli.log_format,
        ..LogConfig::default()
    })?;
    info!(target: "trawl", log = %log_path.display(), "starting trawl");
    if let Some(path) = env_file {
        info!(target: "trawl", file = %path.display(), "loaded environment file");
    }

    // CLI flags win over the YAML file and TRAWL__ overlays
    let cfg = cli.load_config()?;

    let runtime = TrawlRuntime::build()?;
    runtime.install_ctrl_c();
    let outcome = runtime.block_on(pipeline::run(&cli, &cfg, runtime.cancellation()));
    runtime.shutdown(Duration::from_millis(250));

    outcome.map(|_| ())
}
