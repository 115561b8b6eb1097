use std::io::Write;

use stream_schedule::logging::AppendLog;

#[test]
fn appends_lines_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("schedule.log");

    let mut log = AppendLog::new(&path);
    log.write_all(b"[2025-03-15 14:45:00] Fetched 5 streams.\n").unwrap();
    log.write_all(b"[2025-03-15 14:45:00] Filtered streams: 3 streams remaining after filtering.\n").unwrap();

    // A second handle to the same file keeps appending rather than truncating
    let mut again = AppendLog::new(&path);
    again.write_all(b"third\n").unwrap();

    let contents = std::fs::read_to_string(&path).expect("log file written");
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("Fetched 5 streams"));
    assert_eq!(lines[2], "third");
}

#[test]
fn unwritable_path_is_swallowed() {
    // Arrange
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("missing").join("nested").join("schedule.log");
    let mut log = AppendLog::new(&path);

    // Act
    let written = log.write(b"falls back to stderr\n").expect("write never fails");

    // Assert
    assert_eq!(written, 21);
    assert!(!path.exists());
}
