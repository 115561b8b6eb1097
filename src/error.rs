use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Timed out after {timeout:?} waiting for {selector} on {url}")]
    FetchTimeout {
        url: String,
        selector: String,
        timeout: Duration,
    },

    #[error("Fetch failed ({renderer}): {message}")]
    FetchFailure {
        renderer: &'static str,
        message: String,
    },

    #[error("Invalid start time: {0:?}")]
    TimeParse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ScheduleError {
    pub fn fetch(renderer: &'static str, err: impl std::fmt::Display) -> Self {
        ScheduleError::FetchFailure {
            renderer,
            message: err.to_string(),
        }
    }
}
