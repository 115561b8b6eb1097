//! Viewer-facing text derived from a [`StreamRecord`]. Nothing here mutates the
//! record; zone conversion happens at formatting time.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::model::{StartTime, StreamRecord};

/// Elapsed time since `start` as `HH:MM`, floored to whole minutes.
/// Hours are not wrapped at 24; a start in the future shows `00:00`.
pub fn live_duration(start: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - start).num_minutes().max(0);
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Start instant expressed in the viewer's zone.
pub fn local_start(record: &StreamRecord, viewer_tz: Tz) -> Option<DateTime<Tz>> {
    record.start.instant().map(|dt| dt.with_timezone(&viewer_tz))
}

/// First line of a schedule list row.
pub fn schedule_line(record: &StreamRecord, viewer_tz: Tz, now: DateTime<Utc>) -> String {
    match &record.start {
        StartTime::Invalid(_) => "Invalid Start Time".to_string(),
        StartTime::At(start) if record.is_live() => format!("(LIVE) {}", live_duration(*start, now)),
        StartTime::At(start) => start.with_timezone(&viewer_tz).format("%-I:%M %p (%Z)").to_string(),
    }
}

/// Heading of a grid card: the name and local start time.
pub fn card_title(record: &StreamRecord, viewer_tz: Tz) -> String {
    match local_start(record, viewer_tz) {
        Some(local) => format!("{} - {}", record.name, local.format("%-I:%M %p")),
        None => format!("{} - Invalid Time", record.name),
    }
}

pub fn summary(record: &StreamRecord) -> String {
    format!("{} - {}", record.name, record.description)
}
