use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use tracing::{info, instrument, warn};

use crate::error::ScheduleError;
use crate::model::{LiveStatus, RawEntry, StartTime, StreamRecord};

/// Layout of the start-time text on the schedule page: `MM.DD HH:MM`, 24h, no year.
pub const START_FORMAT: &str = "%m.%d %H:%M";

/// Turns raw page entries into typed [`StreamRecord`]s.
///
/// Start times carry no year and no zone. They are read in `home_tz` and the
/// year is the one that puts the instant nearest to `now` (previous, current or
/// next year of the broadcaster's calendar; on an exact tie the earlier wins).
/// A 29 February start only resolves in leap years. Ambiguous local times take
/// the earlier mapping, non-existent ones are invalid.
#[derive(Debug, Clone)]
pub struct Normalizer {
    home_tz: Tz,
    grace: chrono::Duration,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(chrono_tz::Asia::Tokyo, chrono::Duration::minutes(15))
    }
}

impl Normalizer {
    pub fn new(home_tz: Tz, grace: chrono::Duration) -> Self {
        Self { home_tz, grace }
    }

    pub fn home_tz(&self) -> Tz {
        self.home_tz
    }

    pub fn grace(&self) -> chrono::Duration {
        self.grace
    }

    /// Resolve page start-time text to an absolute instant.
    pub fn parse_start(&self, raw: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, ScheduleError> {
        let invalid = || ScheduleError::TimeParse(raw.to_string());

        // 2000 is a leap year, so this validates 02.29 as well
        let template = NaiveDateTime::parse_from_str(&format!("2000.{}", raw.trim()), &format!("%Y.{}", START_FORMAT))
            .map_err(|_| invalid())?;
        let (month, day, hour, minute) = (template.month(), template.day(), template.hour(), template.minute());

        let home_year = now.with_timezone(&self.home_tz).year();
        let mut best: Option<DateTime<Utc>> = None;
        for year in [home_year - 1, home_year, home_year + 1] {
            let Some(naive) = NaiveDate::from_ymd_opt(year, month, day).and_then(|d| d.and_hms_opt(hour, minute, 0)) else {
                continue;
            };
            let Some(local) = self.home_tz.from_local_datetime(&naive).earliest() else {
                continue;
            };
            let candidate = local.with_timezone(&Utc);
            let closer = match best {
                Some(cur) => (now - candidate).abs() < (now - cur).abs(),
                None => true,
            };
            if closer {
                best = Some(candidate);
            }
        }

        best.ok_or_else(invalid)
    }

    /// Convert one entry without filtering. Unparseable start times are kept as
    /// [`StartTime::Invalid`].
    pub fn to_record(&self, entry: RawEntry, now: DateTime<Utc>) -> StreamRecord {
        let start = match self.parse_start(&entry.start, now) {
            Ok(dt) => StartTime::At(dt),
            Err(_) => StartTime::Invalid(entry.start.clone()),
        };
        StreamRecord {
            link: entry.link,
            start_raw: entry.start,
            start,
            name: entry.name,
            description: entry.description,
            live_status: LiveStatus::from_on_air(entry.on_air),
            profile_image_url: entry.profile_image_url,
            background_image_url: entry.background_image_url,
        }
    }

    /// True when the stream started more than `grace` ago and is not on air.
    /// Records without a valid start are never reported stale here.
    pub fn is_stale(&self, record: &StreamRecord, now: DateTime<Utc>) -> bool {
        match record.start.instant() {
            Some(start) => !record.is_live() && now - start > self.grace,
            None => false,
        }
    }

    /// Convert a fetched batch and drop what should no longer be shown: entries
    /// with an unreadable start time, and finished streams that are not live.
    /// Order is preserved.
    #[instrument(level = "info", skip(self, entries), fields(fetched = entries.len()))]
    pub fn normalize(&self, entries: Vec<RawEntry>, now: DateTime<Utc>) -> Vec<StreamRecord> {
        info!(count = entries.len(), "Fetched streams");

        let records: Vec<StreamRecord> = entries
            .into_iter()
            .map(|entry| self.to_record(entry, now))
            .filter(|record| {
                if let StartTime::Invalid(raw) = &record.start {
                    warn!(name = %record.name, start = %raw, "Invalid start time format; dropping stream");
                    return false;
                }
                !self.is_stale(record, now)
            })
            .collect();

        info!(remaining = records.len(), "Filtered streams");
        if records.is_empty() {
            info!("No valid streams found after filtering");
        }
        records
    }
}
