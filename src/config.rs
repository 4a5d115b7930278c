use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::models::TargetUrl;

pub const DEFAULT_PAGESPEED_ENDPOINT: &str =
    "https://www.googleapis.com/pagespeedonline/v5/runPagespeed";
pub const DEFAULT_STRATEGY: &str = "mobile";
pub const DEFAULT_CHROME_PATH: &str = "google-chrome";
pub const DEFAULT_LIGHTHOUSE_PATH: &str = "lighthouse";
pub const DEFAULT_STARTUP_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_MAX_WAIT_MS: u64 = 120_000;

#[derive(Debug, Clone)]
pub struct Config {
    pub target_url: TargetUrl,
    pub database_url: String,
    pub pagespeed: PageSpeedConfig,
    pub chrome: ChromeConfig,
    pub lighthouse: LighthouseConfig,
    pub raw_report_dir: Option<PathBuf>,
    pub run_log: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct PageSpeedConfig {
    pub endpoint: String,
    pub strategy: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChromeConfig {
    pub executable: PathBuf,
    pub startup_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct LighthouseConfig {
    pub executable: PathBuf,
    pub max_wait_for_load_ms: u64,
}

impl Config {
    /// Reads configuration from the process environment, after loading `.env`
    /// if one is present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let target_url = get("AUDIT_TARGET_URL")
            .ok_or_else(|| anyhow!("AUDIT_TARGET_URL is not set"))?;
        let target_url = TargetUrl::parse(&target_url)?;
        let database_url = get("DATABASE_URL").ok_or_else(|| anyhow!("DATABASE_URL is not set"))?;

        let startup_secs = match get("CHROME_STARTUP_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("invalid CHROME_STARTUP_TIMEOUT_SECS: {}", raw))?,
            None => DEFAULT_STARTUP_TIMEOUT_SECS,
        };
        let max_wait_ms = match get("LIGHTHOUSE_MAX_WAIT_MS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("invalid LIGHTHOUSE_MAX_WAIT_MS: {}", raw))?,
            None => DEFAULT_MAX_WAIT_MS,
        };

        Ok(Config {
            target_url,
            database_url,
            pagespeed: PageSpeedConfig {
                endpoint: get("PAGESPEED_ENDPOINT")
                    .unwrap_or_else(|| DEFAULT_PAGESPEED_ENDPOINT.to_string()),
                strategy: get("PAGESPEED_STRATEGY").unwrap_or_else(|| DEFAULT_STRATEGY.to_string()),
                api_key: get("PAGESPEED_API_KEY"),
            },
            chrome: ChromeConfig {
                executable: get("CHROME_PATH")
                    .unwrap_or_else(|| DEFAULT_CHROME_PATH.to_string())
                    .into(),
                startup_timeout: Duration::from_secs(startup_secs),
            },
            lighthouse: LighthouseConfig {
                executable: get("LIGHTHOUSE_PATH")
                    .unwrap_or_else(|| DEFAULT_LIGHTHOUSE_PATH.to_string())
                    .into(),
                max_wait_for_load_ms: max_wait_ms,
            },
            raw_report_dir: get("AUDIT_RAW_REPORT_DIR").map(PathBuf::from),
            run_log: get("AUDIT_RUN_LOG").map(PathBuf::from),
        })
    }
}
