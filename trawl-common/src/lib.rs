//! Common types and utilities shared across trawl crates.
//!
//! This crate defines the error taxonomy, timing primitives, and
//! observability helpers used throughout the trawl workspace. It is kept
//! lightweight so that every crate can depend on it without pulling in the
//! browser stack.
//!
//! # Overview
//!
//! - [`TrawlError`] and [`Result`]: shared error handling
//! - [`DelayRange`]: bounded jitter used for politeness and settle delays
//! - [`StealthLevel`]: how aggressively the browser session hides automation
//! - [`observability`]: centralised tracing/logging initialisation
//!
//! # Examples
//!
//! Sampling a politeness delay:
//!
//! ```rust
//! use trawl_common::DelayRange;
//! use std::time::Duration;
//!
//! let range = DelayRange::from_secs(3, 6);
//! let delay = range.sample();
//! assert!(delay >= Duration::from_secs(3) && delay <= Duration::from_secs(6));
//! ```
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub mod observability;

/// Inclusive range of milliseconds from which a jittered delay is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    /// Build a range; bounds given in the wrong order are swapped.
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        if min_ms <= max_ms {
            Self { min_ms, max_ms }
        } else {
            Self {
                min_ms: max_ms,
                max_ms: min_ms,
            }
        }
    }

    pub fn from_secs(min: u64, max: u64) -> Self {
        Self::new(min * 1000, max * 1000)
    }

    /// A range that always yields zero. Handy for tests and dry runs.
    pub fn zero() -> Self {
        Self::new(0, 0)
    }

    /// Draw a delay uniformly from `[min_ms, max_ms]` using the thread RNG.
    pub fn sample(&self) -> Duration {
        self.sample_with(&mut rand::thread_rng())
    }

    /// Draw a delay uniformly from `[min_ms, max_ms]` with a caller supplied RNG.
    pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let lo = self.min_ms.min(self.max_ms);
        let hi = self.min_ms.max(self.max_ms);
        Duration::from_millis(rng.gen_range(lo..=hi))
    }
}

/// Browser automation stealth level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StealthLevel {
    /// Only the `navigator.webdriver` mask.
    Lightweight,
    /// Core evasions plus canvas noise.
    #[default]
    Balanced,
    /// Everything, including WebGL vendor and platform spoofing.
    Maximum,
}

/// Error types used across the trawl system.
///
/// Setup failures ([`TrawlError::DriverResolution`], [`TrawlError::SessionInit`])
/// abort a run. Everything else is contained at the point it happens.
#[derive(thiserror::Error, Debug)]
pub enum TrawlError {
    /// No usable driver executable was found after every discovery strategy.
    #[error("no valid driver executable found; searched: {}", display_roots(.roots))]
    DriverResolution { roots: Vec<PathBuf> },

    /// The automation session could not be created.
    #[error("session init failed: {0}")]
    SessionInit(String),

    /// The sign-in sequence did not complete.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// A page did not become ready in time.
    #[error("timed out after {timeout:?} waiting for {url}")]
    NavigationTimeout { url: String, timeout: Duration },

    /// A driver (browser, process, etc.) reported an error.
    #[error("driver error: {0}")]
    Driver(#[from] anyhow::Error),

    /// Configuration was incomplete or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Writing or reading the tabular output failed.
    #[error("csv error: {0}")]
    Csv(String),
}

impl TrawlError {
    /// Whether this error must abort the run rather than skip an item.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TrawlError::DriverResolution { .. } | TrawlError::SessionInit(_)
        )
    }
}

fn display_roots(roots: &[PathBuf]) -> String {
    if roots.is_empty() {
        return "<none>".to_string();
    }
    roots
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convenient alias for results that use [`TrawlError`].
pub type Result<T> = std::result::Result<T, TrawlError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn sampled_delays_stay_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for (a, b) in [(0, 0), (3000, 6000), (1000, 2000), (2000, 6000), (5, 5)] {
            let range = DelayRange::new(a, b);
            for _ in 0..500 {
                let d = range.sample_with(&mut rng);
                assert!(d >= Duration::from_millis(a) && d <= Duration::from_millis(b));
            }
        }
    }

    #[test]
    fn reversed_bounds_are_normalised() {
        let range = DelayRange::new(6000, 3000);
        assert_eq!(range, DelayRange::new(3000, 6000));
    }

    #[test]
    fn stealth_level_parses_lowercase() {
        let lvl: StealthLevel = serde_json::from_str("\"maximum\"").unwrap();
        assert_eq!(lvl, StealthLevel::Maximum);
        assert_eq!(StealthLevel::default(), StealthLevel::Balanced);
    }

    #[test]
    fn resolution_error_lists_roots() {
        let err = TrawlError::DriverResolution {
            roots: vec![PathBuf::from("/a"), PathBuf::from("/b")],
        };
        assert!(err.to_string().contains("/a, /b"));
        assert!(err.is_fatal());
        assert!(!TrawlError::Authentication("nope".into()).is_fatal());
    }
}
