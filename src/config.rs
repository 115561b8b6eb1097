use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;

pub const DEFAULT_SCHEDULE_URL: &str = "https://hololive.hololivepro.com/en/schedule/";
pub const DEFAULT_READY_SELECTOR: &str = "#today li";
pub const DEFAULT_PLAYER_BASE_URL: &str = "https://cdpn.io/pen/debug/oNPzxKo";

pub const MAX_FETCH_TIMEOUT_SECS: u64 = 10 * 60;
pub const MAX_REFRESH_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;
pub const MAX_RETRY_BACKOFF_SECS: u64 = 60 * 60;
pub const MAX_STALE_GRACE_MINUTES: i64 = 7 * 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// Pick by host capability.
    Auto,
    Chrome,
    WebDriver,
    Static,
}

impl FromStr for RendererKind {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(RendererKind::Auto),
            "chrome" => Ok(RendererKind::Chrome),
            "webdriver" => Ok(RendererKind::WebDriver),
            "static" => Ok(RendererKind::Static),
            other => Err(ScheduleError::Config(format!("unknown renderer: {}", other))),
        }
    }
}

/// Runtime settings. Every field has a default so a partial JSON document or
/// an empty environment still yields a usable configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub schedule_url: String,
    pub renderer: RendererKind,
    pub webdriver_url: String,
    pub ready_selector: String,
    pub fetch_timeout_secs: u64,
    pub refresh_interval_secs: u64,
    pub retry_attempts: u32,
    pub retry_backoff_secs: u64,
    pub home_timezone: String,
    pub viewer_timezone: String,
    pub stale_grace_minutes: i64,
    pub player_base_url: String,
    pub log_file: PathBuf,
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schedule_url: DEFAULT_SCHEDULE_URL.to_string(),
            renderer: RendererKind::Auto,
            webdriver_url: "http://localhost:4444".to_string(),
            ready_selector: DEFAULT_READY_SELECTOR.to_string(),
            fetch_timeout_secs: 30,
            refresh_interval_secs: 30 * 60,
            retry_attempts: 2,
            retry_backoff_secs: 30,
            home_timezone: "Asia/Tokyo".to_string(),
            viewer_timezone: "America/New_York".to_string(),
            stale_grace_minutes: 15,
            player_base_url: DEFAULT_PLAYER_BASE_URL.to_string(),
            log_file: PathBuf::from("stream-schedule.log"),
            log_json: false,
        }
    }
}

impl Config {
    /// Parse a JSON document and validate it.
    pub fn from_json(body: &str) -> Result<Self, ScheduleError> {
        let config: Config = serde_json::from_str(body)
            .map_err(|e| ScheduleError::Config(format!("invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with `SCHEDULE_*` environment variables.
    pub fn from_env() -> Result<Self, ScheduleError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Config::from_env`] but with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ScheduleError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(v) = lookup("SCHEDULE_URL") {
            config.schedule_url = v;
        }
        if let Some(v) = lookup("SCHEDULE_RENDERER") {
            config.renderer = v.parse()?;
        }
        if let Some(v) = lookup("SCHEDULE_WEBDRIVER_URL") {
            config.webdriver_url = v;
        }
        if let Some(v) = lookup("SCHEDULE_READY_SELECTOR") {
            config.ready_selector = v;
        }
        if let Some(v) = lookup("SCHEDULE_FETCH_TIMEOUT_SECS") {
            config.fetch_timeout_secs = parse_number("SCHEDULE_FETCH_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("SCHEDULE_REFRESH_INTERVAL_SECS") {
            config.refresh_interval_secs = parse_number("SCHEDULE_REFRESH_INTERVAL_SECS", &v)?;
        }
        if let Some(v) = lookup("SCHEDULE_RETRY_ATTEMPTS") {
            config.retry_attempts = parse_number("SCHEDULE_RETRY_ATTEMPTS", &v)?;
        }
        if let Some(v) = lookup("SCHEDULE_RETRY_BACKOFF_SECS") {
            config.retry_backoff_secs = parse_number("SCHEDULE_RETRY_BACKOFF_SECS", &v)?;
        }
        if let Some(v) = lookup("SCHEDULE_HOME_TZ") {
            config.home_timezone = v;
        }
        if let Some(v) = lookup("SCHEDULE_VIEWER_TZ") {
            config.viewer_timezone = v;
        }
        if let Some(v) = lookup("SCHEDULE_STALE_GRACE_MINUTES") {
            config.stale_grace_minutes = parse_number("SCHEDULE_STALE_GRACE_MINUTES", &v)?;
        }
        if let Some(v) = lookup("SCHEDULE_PLAYER_BASE_URL") {
            config.player_base_url = v;
        }
        if let Some(v) = lookup("SCHEDULE_LOG_FILE") {
            config.log_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("SCHEDULE_LOG_JSON") {
            config.log_json = matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ScheduleError> {
        self.home_tz()?;
        self.viewer_tz()?;
        check_range("refresh_interval_secs", self.refresh_interval_secs, 1, MAX_REFRESH_INTERVAL_SECS)?;
        check_range("fetch_timeout_secs", self.fetch_timeout_secs, 1, MAX_FETCH_TIMEOUT_SECS)?;
        check_range("retry_backoff_secs", self.retry_backoff_secs, 0, MAX_RETRY_BACKOFF_SECS)?;
        check_range("stale_grace_minutes", self.stale_grace_minutes, 0, MAX_STALE_GRACE_MINUTES)?;
        Ok(())
    }

    pub fn home_tz(&self) -> Result<Tz, ScheduleError> {
        parse_tz(&self.home_timezone)
    }

    pub fn viewer_tz(&self) -> Result<Tz, ScheduleError> {
        parse_tz(&self.viewer_timezone)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }

    pub fn stale_grace(&self) -> Result<chrono::Duration, ScheduleError> {
        chrono::Duration::try_minutes(self.stale_grace_minutes)
            .ok_or_else(|| ScheduleError::Config(format!("stale_grace_minutes out of range: {}", self.stale_grace_minutes)))
    }
}

fn parse_tz(name: &str) -> Result<Tz, ScheduleError> {
    Tz::from_str(name).map_err(|_| ScheduleError::Config(format!("unknown timezone: {}", name)))
}

fn check_range<T: PartialOrd + std::fmt::Display>(key: &str, value: T, min: T, max: T) -> Result<(), ScheduleError> {
    if value < min || value > max {
        return Err(ScheduleError::Config(format!("{} must be between {} and {}, got {}", key, min, max, value)));
    }
    Ok(())
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, ScheduleError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ScheduleError::Config(format!("{} is not a valid number: {}", key, value)))
}
