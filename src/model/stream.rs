use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder stored in place of any field the schedule page did not provide.
pub const UNKNOWN: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiveStatus {
    Live,
    NotLive,
}

impl LiveStatus {
    pub fn from_on_air(on_air: bool) -> Self {
        if on_air { LiveStatus::Live } else { LiveStatus::NotLive }
    }
}

/// Field tuple for one `<li>` of the schedule list, before any typing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub link: String,
    pub start: String,
    pub name: String,
    pub description: String,
    pub on_air: bool,
    pub profile_image_url: String,
    pub background_image_url: String,
}

impl Default for RawEntry {
    fn default() -> Self {
        Self {
            link: UNKNOWN.to_string(),
            start: UNKNOWN.to_string(),
            name: UNKNOWN.to_string(),
            description: UNKNOWN.to_string(),
            on_air: false,
            profile_image_url: UNKNOWN.to_string(),
            background_image_url: UNKNOWN.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StartTime {
    At(DateTime<Utc>),
    // Raw text kept so the consumer can still show what the page said
    Invalid(String),
}

impl StartTime {
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            StartTime::At(dt) => Some(*dt),
            StartTime::Invalid(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamRecord {
    pub link: String,
    pub start_raw: String,
    pub start: StartTime,
    pub name: String,
    pub description: String,
    pub live_status: LiveStatus,
    pub profile_image_url: String,
    pub background_image_url: String,
}

impl StreamRecord {
    pub fn is_live(&self) -> bool {
        self.live_status == LiveStatus::Live
    }

    /// Site video id taken from the `v=` query parameter of `link`.
    pub fn video_id(&self) -> Option<&str> {
        crate::video::video_id(&self.link)
    }
}
