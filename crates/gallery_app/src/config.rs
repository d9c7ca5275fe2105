use gallery_engine::{ConfigError, ListingSettings, PipelineConfig};

pub const ENV_BASE_URL: &str = "CANVAS_BASE_URL";
pub const ENV_API_TOKEN: &str = "CANVAS_API_TOKEN";
pub const ENV_COURSE_ID: &str = "COURSE_ID";
pub const ENV_ASSIGNMENT_ID: &str = "ASSIGNMENT_ID";
pub const ENV_CHROME_DEBUG_URL: &str = "CHROME_DEBUG_URL";
pub const ENV_CHROME_BIN: &str = "CHROME_BIN";

const DEFAULT_CHROME_BIN: &str = "chromium";

/// How to reach a browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserSource {
    /// DevTools HTTP endpoint of an already running browser.
    Attach(String),
    /// Binary to start headless.
    Launch(String),
}

/// Everything the binary needs, gathered from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listing: ListingSettings,
    pub browser: BrowserSource,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &'static str| value(key).ok_or(ConfigError::Missing(key));

        let listing = ListingSettings::new(
            required(ENV_BASE_URL)?,
            required(ENV_COURSE_ID)?,
            required(ENV_ASSIGNMENT_ID)?,
            required(ENV_API_TOKEN)?,
        );
        let browser = match value(ENV_CHROME_DEBUG_URL) {
            Some(url) => BrowserSource::Attach(url),
            None => BrowserSource::Launch(
                value(ENV_CHROME_BIN).unwrap_or_else(|| DEFAULT_CHROME_BIN.to_string()),
            ),
        };
        let pipeline = PipelineConfig::from_lookup(&lookup)?;

        Ok(Self {
            listing,
            browser,
            pipeline,
        })
    }
}
