use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use gallery_core::ForgeHosts;
use thiserror::Error;

use crate::capture::CaptureSettings;

pub const ENV_FETCH_CONCURRENCY: &str = "GALLERY_FETCH_CONCURRENCY";
pub const ENV_CAPTURE_CONCURRENCY: &str = "GALLERY_CAPTURE_CONCURRENCY";
pub const ENV_NAV_TIMEOUT_MS: &str = "GALLERY_NAV_TIMEOUT_MS";
pub const ENV_SETTLE_MS: &str = "GALLERY_SETTLE_MS";
pub const ENV_COURTESY_MS: &str = "GALLERY_COURTESY_MS";
pub const ENV_OUTPUT_DIR: &str = "GALLERY_OUTPUT_DIR";
pub const ENV_ALLOW_COMMENT_URLS: &str = "GALLERY_ALLOW_COMMENT_URLS";

const DEFAULT_CONCURRENCY: NonZeroUsize = match NonZeroUsize::new(16) {
    Some(n) => n,
    None => NonZeroUsize::MIN,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{key} must be {expected}, got {value:?}")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("{0} is required")]
    Missing(&'static str),
}

/// Where the gallery and its images are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub dir: PathBuf,
    pub screenshots_subdir: String,
    pub document_filename: String,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("docs"),
            screenshots_subdir: "screenshots".to_string(),
            document_filename: "index.html".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Simultaneous metadata lookups.
    pub fetch_concurrency: NonZeroUsize,
    /// Simultaneous page captures.
    pub capture_concurrency: NonZeroUsize,
    pub capture: CaptureSettings,
    pub output: OutputLayout,
    pub forge: ForgeHosts,
    /// Accept a URL found in the first submission comment when the
    /// submission itself has none.
    pub allow_comment_urls: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch_concurrency: DEFAULT_CONCURRENCY,
            capture_concurrency: DEFAULT_CONCURRENCY,
            capture: CaptureSettings::default(),
            output: OutputLayout::default(),
            forge: ForgeHosts::github(),
            allow_comment_urls: false,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults, overridden by whatever `lookup` returns for the `GALLERY_*` keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let lookup = |key: &'static str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(raw) = lookup(ENV_FETCH_CONCURRENCY) {
            config.fetch_concurrency = parse_limit(ENV_FETCH_CONCURRENCY, &raw)?;
        }
        if let Some(raw) = lookup(ENV_CAPTURE_CONCURRENCY) {
            config.capture_concurrency = parse_limit(ENV_CAPTURE_CONCURRENCY, &raw)?;
        }
        if let Some(raw) = lookup(ENV_NAV_TIMEOUT_MS) {
            config.capture.navigation_timeout = parse_millis(ENV_NAV_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_SETTLE_MS) {
            config.capture.settle_delay = parse_millis(ENV_SETTLE_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_COURTESY_MS) {
            config.capture.courtesy_delay = parse_millis(ENV_COURTESY_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_OUTPUT_DIR) {
            config.output.dir = PathBuf::from(raw.trim());
        }
        if let Some(raw) = lookup(ENV_ALLOW_COMMENT_URLS) {
            config.allow_comment_urls = parse_flag(ENV_ALLOW_COMMENT_URLS, &raw)?;
        }
        Ok(config)
    }
}

fn parse_limit(key: &'static str, raw: &str) -> Result<NonZeroUsize, ConfigError> {
    raw.trim()
        .parse::<NonZeroUsize>()
        .map_err(|_| ConfigError::Invalid {
            key,
            value: raw.to_string(),
            expected: "a positive integer",
        })
}

fn parse_millis(key: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ConfigError::Invalid {
            key,
            value: raw.to_string(),
            expected: "a whole number of milliseconds",
        })
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
            expected: "a boolean",
        }),
    }
}
