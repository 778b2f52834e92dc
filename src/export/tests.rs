use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use crate::export::{append_history_csv, export_latest_json, ExportPaths};
use crate::sample::{PartitionUsage, Sample};
use crate::store::MetricStore;

fn scratch_store() -> (TempDir, MetricStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = MetricStore::open(dir.path().join("metrics.db")).unwrap();
    (dir, store)
}

fn sample() -> Sample {
    let ts = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
    let mut s = Sample::new("web-01", 42.5, 17_179_869_184, 8_589_934_592, 50.0).at(ts);
    s.disk_usage.insert(
        "/".to_string(),
        PartitionUsage { total: 1000, used: 550, percent: 55.0 },
    );
    s
}

#[test]
fn test_history_header_written_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.csv");

    append_history_csv(&sample(), &path).unwrap();
    append_history_csv(&sample(), &path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        "timestamp,hostname,cpu_percent,mem_total_gb,mem_dispo_gb,mem_percent,disk_root_percent"
    );
    assert_eq!(lines[1], "2026-03-14T09:26:53,web-01,42.5,16.00,8.00,50,55");
}

#[test]
fn test_history_blank_root_disk_column() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.csv");

    let mut s = sample();
    s.disk_usage.clear();
    append_history_csv(&s, &path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.lines().nth(1).unwrap().ends_with(",50,"));
}

#[test]
fn test_history_round_trips_through_stats() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.csv");

    for cpu in [10.0, 90.0, 50.0] {
        let mut s = sample();
        s.cpu_percent = cpu;
        append_history_csv(&s, &path).unwrap();
    }

    let report = crate::stats::aggregate_csv(&path).unwrap().unwrap();
    assert_eq!(report.count, 3);
    assert_eq!(report.cpu.avg, 50.0);
    assert_eq!(report.cpu.min, 10.0);
    assert_eq!(report.cpu.max, 90.0);
}

#[test]
fn test_json_export_round_trip() {
    let (dir, store) = scratch_store();
    let path = dir.path().join("last.json");

    store.save(&sample()).unwrap();
    let written = export_latest_json(&store, "web-01", 100, &path).unwrap();
    assert_eq!(written, 1);

    let text = std::fs::read_to_string(&path).unwrap();
    let back: Vec<Sample> = serde_json::from_str(&text).unwrap();
    assert_eq!(back.len(), 1);
    assert_eq!(back[0].hostname, "web-01");
    assert_eq!(back[0].disk_usage["/"].percent, 55.0);
}

#[test]
fn test_json_export_empty_host_writes_empty_array() {
    let (dir, store) = scratch_store();
    let path = dir.path().join("last.json");

    let written = export_latest_json(&store, "nobody", 100, &path).unwrap();
    assert_eq!(written, 0);

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.trim(), "[]");
}

#[test]
fn test_export_paths_bundle() {
    let (dir, store) = scratch_store();
    let paths = ExportPaths {
        history_path: dir.path().join("history.csv"),
        export_path: dir.path().join("last.json"),
    };

    store.save(&sample()).unwrap();
    paths.append_history(&sample()).unwrap();
    let written = paths.export_latest(&store, "web-01", 10).unwrap();

    assert_eq!(written, 1);
    assert!(paths.history_path.exists());
    assert!(paths.export_path.exists());
}

#[test]
fn test_export_paths_defaults() {
    let paths = ExportPaths::default();
    assert_eq!(paths.history_path.to_str(), Some("syswatch_history.csv"));
    assert_eq!(paths.export_path.to_str(), Some("syswatch_last.json"));
}
