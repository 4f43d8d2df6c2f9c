use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use trawl_common::observability::LogFormat;
use trawl_config::{TrawlConfig, TrawlConfigLoader};

/// Picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "trawl.yaml";

/// Optional `KEY=value` file for credentials and driver paths.
pub const ENV_FILE: &str = ".env";

/// Load `path` into the process environment if it exists. Variables that
/// are already set win over the file.
pub fn load_env_file(path: &Path) -> Option<PathBuf> {
    dotenvy::from_path(path).ok().map(|()| path.to_path_buf())
}

#[derive(Debug, Parser)]
#[command(name = "trawl", version, about = "Visit profile pages and save what they show as CSV")]
pub struct Cli {
    /// Newline-delimited list of profile URLs
    #[arg(long, default_value = "urls.txt")]
    pub urls: PathBuf,

    /// Where the CSV is written
    #[arg(long, default_value = "profiles.csv")]
    pub output: PathBuf,

    /// Run the browser without a window
    #[arg(long)]
    pub headless: bool,

    /// Sign in with LINKEDIN_EMAIL / LINKEDIN_PASSWORD (environment or .env) before crawling
    #[arg(long)]
    pub login: bool,

    /// YAML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Driver executable to use before any discovery
    #[arg(long, env = "CHROME_DRIVER_PATH")]
    pub driver_path: Option<PathBuf>,

    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    #[arg(long, default_value = "text")]
    pub log_format: LogFormat,
}

impl Cli {
    /// Merge config sources, apply flag overrides, and validate.
    pub fn load_config(&self) -> Result<TrawlConfig> {
        let loader = match &self.config {
            Some(path) => TrawlConfigLoader::new().with_file(path),
            None => TrawlConfigLoader::new().with_optional_file(DEFAULT_CONFIG_FILE),
        };
        let mut cfg = loader.load()?;
        self.apply(&mut cfg);
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply(&self, cfg: &mut TrawlConfig) {
        if self.headless {
            cfg.session.headless = true;
        }
        if let Some(path) = &self.driver_path {
            cfg.driver.explicit_path = Some(path.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        temp_env::with_var_unset("CHROME_DRIVER_PATH", || {
            Cli::try_parse_from(std::iter::once("trawl").chain(args.iter().copied())).unwrap()
        })
    }

    #[test]
    fn defaults_match_documented_paths() {
        let cli = parse(&[]);
        assert_eq!(cli.urls, PathBuf::from("urls.txt"));
        assert_eq!(cli.output, PathBuf::from("profiles.csv"));
        assert!(!cli.headless);
        assert!(!cli.login);
        assert_eq!(cli.log_format, LogFormat::Text);
    }

    #[test]
    fn driver_path_falls_back_to_env() {
        let cli = temp_env::with_var("CHROME_DRIVER_PATH", Some("/opt/cd/chromedriver"), || {
            Cli::try_parse_from(["trawl"]).unwrap()
        });
        assert_eq!(cli.driver_path, Some(PathBuf::from("/opt/cd/chromedriver")));
    }

    #[test]
    fn env_file_fills_unset_variables_only() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(".env");
        std::fs::write(
            &file,
            "TRAWL_TEST_DOTENV_EMAIL=ada@example.com\nTRAWL_TEST_DOTENV_KEEP=from-file\n",
        )
        .unwrap();

        temp_env::with_vars(
            [
                ("TRAWL_TEST_DOTENV_EMAIL", None),
                ("TRAWL_TEST_DOTENV_KEEP", Some("from-shell")),
            ],
            || {
                assert_eq!(load_env_file(&file), Some(file.clone()));
                assert_eq!(
                    std::env::var("TRAWL_TEST_DOTENV_EMAIL").as_deref(),
                    Ok("ada@example.com")
                );
                assert_eq!(
                    std::env::var("TRAWL_TEST_DOTENV_KEEP").as_deref(),
                    Ok("from-shell")
                );
            },
        );
    }

    #[test]
    fn missing_env_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_env_file(&dir.path().join(".env")).is_none());
    }

    #[test]
    fn rejects_unknown_log_format() {
        assert!(Cli::try_parse_from(["trawl", "--log-format", "xml"]).is_err());
    }

    #[test]
    fn flags_override_file_settings() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("custom.yaml");
        std::fs::write(
            &file,
            "session:\n  headless: false\n  stealth_level: maximum\ndriver:\n  explicit_path: /from/yaml\n",
        )
        .unwrap();

        let cli = parse(&[
            "--config",
            file.to_str().unwrap(),
            "--headless",
            "--driver-path",
            "/from/flag",
        ]);
        let cfg = cli.load_config().unwrap();
        assert!(cfg.session.headless);
        assert_eq!(cfg.driver.explicit_path, Some(PathBuf::from("/from/flag")));
        assert_eq!(
            cfg.session.stealth_level,
            trawl_common::StealthLevel::Maximum
        );
    }

    #[test]
    fn explicit_config_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.yaml");
        let cli = parse(&["--config", missing.to_str().unwrap()]);
        assert!(cli.load_config().is_err());
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bad.yaml");
        std::fs::write(&file, "crawl:\n  page_timeout_secs: 0\n").unwrap();
        let cli = parse(&["--config", file.to_str().unwrap()]);
        assert!(cli.load_config().is_err());
    }
}
