use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Asia::Tokyo;
use chrono_tz::America::New_York;

use stream_schedule::model::{LiveStatus, RawEntry, StartTime, UNKNOWN};
use stream_schedule::normalizer::Normalizer;
use stream_schedule::parser;

fn tokyo(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Tokyo.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap().with_timezone(&Utc)
}

fn entry(start: &str, on_air: bool) -> RawEntry {
    RawEntry {
        link: "https://www.youtube.com/watch?v=abc123".to_string(),
        start: start.to_string(),
        name: "Test Talent".to_string(),
        description: "Test stream".to_string(),
        on_air,
        ..RawEntry::default()
    }
}

#[test]
fn start_time_is_read_in_broadcaster_zone() {
    // Arrange
    let normalizer = Normalizer::default();
    let now = tokyo(2025, 3, 15, 10, 0);

    // Act
    let start = normalizer.parse_start("03.15 14:30", now).expect("valid start");

    // Assert
    assert_eq!(start, Utc.with_ymd_and_hms(2025, 3, 15, 5, 30, 0).unwrap());
}

#[test]
fn upcoming_entry_survives_within_grace_window() {
    let normalizer = Normalizer::default();

    let at_edge = normalizer.normalize(vec![entry("03.15 14:30", false)], tokyo(2025, 3, 15, 14, 45));
    assert_eq!(at_edge.len(), 1, "exactly 15 minutes late is still shown");

    let past_edge = normalizer.normalize(vec![entry("03.15 14:30", false)], tokyo(2025, 3, 15, 14, 46));
    assert!(past_edge.is_empty(), "16 minutes late and not live is dropped");
}

#[test]
fn live_entries_are_kept_however_old() {
    // Arrange
    let normalizer = Normalizer::default();

    // Act
    let records = normalizer.normalize(vec![entry("03.15 08:00", true)], tokyo(2025, 3, 15, 14, 45));

    // Assert
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].live_status, LiveStatus::Live);
}

#[test]
fn live_status_comes_from_marker_even_with_bad_time() {
    let normalizer = Normalizer::default();
    let record = normalizer.to_record(entry("soon", true), tokyo(2025, 3, 15, 14, 45));
    assert_eq!(record.live_status, LiveStatus::Live);
    assert_eq!(record.start, StartTime::Invalid("soon".to_string()));
    assert_eq!(record.start_raw, "soon");
}

#[test]
fn invalid_start_times_are_dropped_by_normalize() {
    let normalizer = Normalizer::default();
    let now = tokyo(2025, 3, 15, 14, 45);
    let records = normalizer.normalize(vec![entry("TBD", false), entry("TBD", true), entry("03.15 20:00", false)], now);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].start_raw, "03.15 20:00");
}

#[test]
fn missing_description_is_carried_as_unknown() {
    let normalizer = Normalizer::default();
    let raw = RawEntry {
        description: UNKNOWN.to_string(),
        ..entry("03.15 20:00", false)
    };
    let records = normalizer.normalize(vec![raw], tokyo(2025, 3, 15, 14, 45));
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].description, UNKNOWN);
    assert_eq!(records[0].profile_image_url, UNKNOWN);
}

#[test]
fn rejects_out_of_range_values() {
    let normalizer = Normalizer::default();
    let now = tokyo(2025, 3, 15, 14, 45);
    for raw in ["13.01 10:00", "03.32 10:00", "03.15 25:00", "03.15", "", UNKNOWN] {
        assert!(normalizer.parse_start(raw, now).is_err(), "{:?} should not parse", raw);
    }
}

#[test]
fn new_year_rolls_forward_to_next_year() {
    let normalizer = Normalizer::default();
    let now = tokyo(2025, 12, 31, 23, 0);
    let start = normalizer.parse_start("01.01 01:00", now).expect("valid start");
    assert_eq!(start, tokyo(2026, 1, 1, 1, 0));
}

#[test]
fn new_year_rolls_back_to_previous_year() {
    let normalizer = Normalizer::default();
    let now = tokyo(2026, 1, 1, 0, 30);
    let start = normalizer.parse_start("12.31 23:50", now).expect("valid start");
    assert_eq!(start, tokyo(2025, 12, 31, 23, 50));
}

#[test]
fn year_is_taken_from_broadcaster_calendar() {
    // 15:30 UTC on 31 Dec is already 1 Jan in Tokyo
    let normalizer = Normalizer::default();
    let now = Utc.with_ymd_and_hms(2025, 12, 31, 15, 30, 0).unwrap();
    let start = normalizer.parse_start("01.01 01:00", now).expect("valid start");
    assert_eq!(start, tokyo(2026, 1, 1, 1, 0));
}

#[test]
fn leap_day_resolves_to_nearest_leap_year() {
    let normalizer = Normalizer::default();
    let start = normalizer.parse_start("02.29 10:00", tokyo(2025, 3, 1, 0, 0)).expect("valid start");
    assert_eq!(start, tokyo(2024, 2, 29, 10, 0));

    // No leap year within a year either side of 2026
    assert!(normalizer.parse_start("02.29 10:00", tokyo(2026, 6, 1, 0, 0)).is_err());
}

#[test]
fn viewer_zone_round_trip_is_lossless() {
    let normalizer = Normalizer::default();
    let start = normalizer.parse_start("03.15 14:30", tokyo(2025, 3, 15, 12, 0)).expect("valid start");

    let viewer = start.with_timezone(&New_York);
    let back = viewer.with_timezone(&Tokyo);
    assert_eq!(back.with_timezone(&Utc), start);
    assert_eq!(back.format("%m.%d %H:%M").to_string(), "03.15 14:30");
}

#[test]
fn custom_grace_window_is_honoured() {
    let normalizer = Normalizer::new(Tokyo, chrono::Duration::minutes(60));
    let records = normalizer.normalize(vec![entry("03.15 14:00", false)], tokyo(2025, 3, 15, 14, 45));
    assert_eq!(records.len(), 1);
}

#[test]
fn sample_page_filters_to_current_streams() {
    let html = std::fs::read_to_string("tests/schedule_sample.html").expect("failed to read schedule_sample.html");
    let records = Normalizer::default().normalize(parser::parse(&html), tokyo(2025, 3, 15, 14, 45));

    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Usada Pekora", "Houshou Marine", "Hoshimachi Suisei"]);
    assert!(records[0].is_live());
    assert_eq!(records[0].video_id(), Some("abc123"));
    assert_eq!(records[2].description, UNKNOWN);
}
