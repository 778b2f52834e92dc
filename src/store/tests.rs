use chrono::{Duration, Utc};
use tempfile::TempDir;

use crate::sample::{PartitionUsage, Sample};
use crate::store::{format_ts, parse_ts, MetricStore};

fn scratch_store() -> (TempDir, MetricStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = MetricStore::open(dir.path().join("metrics.db")).unwrap();
    (dir, store)
}

fn sample(host: &str, cpu: f64, minutes_ago: i64) -> Sample {
    Sample::new(host, cpu, 16_000_000, 8_000_000, 50.0)
        .at(Utc::now() - Duration::minutes(minutes_ago))
}

#[test]
fn test_open_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metrics.db");

    let first = MetricStore::open(&path).unwrap();
    first.save(&sample("h1", 10.0, 0)).unwrap();

    // Reopening must not disturb existing rows.
    let second = MetricStore::open(&path).unwrap();
    assert_eq!(second.get_latest("h1", 10).unwrap().len(), 1);
}

#[test]
fn test_get_latest_descending_order() {
    let (_dir, store) = scratch_store();
    for minutes_ago in [30, 20, 10] {
        store.save(&sample("h1", 42.0, minutes_ago)).unwrap();
    }

    let rows = store.get_latest("h1", 3).unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.windows(2).all(|w| w[0].timestamp > w[1].timestamp));
}

#[test]
fn test_get_latest_respects_limit_and_host() {
    let (_dir, store) = scratch_store();
    for minutes_ago in [40, 30, 20, 10] {
        store.save(&sample("h1", 10.0, minutes_ago)).unwrap();
    }
    store.save(&sample("h2", 99.0, 5)).unwrap();

    assert_eq!(store.get_latest("h1", 2).unwrap().len(), 2);
    assert_eq!(store.get_latest("h1", 100).unwrap().len(), 4);
    assert_eq!(store.get_latest("h2", 100).unwrap().len(), 1);
    assert!(store.get_latest("unknown", 10).unwrap().is_empty());
}

#[test]
fn test_duplicate_samples_are_both_stored() {
    let (_dir, store) = scratch_store();
    let s = sample("h1", 50.0, 10);
    store.save(&s).unwrap();
    store.save(&s).unwrap();

    assert_eq!(store.get_latest("h1", 10).unwrap().len(), 2);
}

#[test]
fn test_save_round_trips_all_fields() {
    let (_dir, store) = scratch_store();

    let mut s = sample("web-01", 42.5, 3);
    s.memory_total = 17_179_869_184;
    s.memory_available = 4_294_967_296;
    s.memory_percent = 75.0;
    s.disk_usage.insert(
        "/".to_string(),
        PartitionUsage { total: 500_000_000_000, used: 250_000_000_000, percent: 50.0 },
    );
    s.disk_usage.insert(
        "/home".to_string(),
        PartitionUsage { total: 1_000_000_000_000, used: 100_000_000_000, percent: 10.0 },
    );
    store.save(&s).unwrap();

    let rows = store.get_latest("web-01", 1).unwrap();
    assert_eq!(rows.len(), 1);
    let back = &rows[0];

    assert_eq!(back.hostname, s.hostname);
    assert_eq!(back.cpu_percent, s.cpu_percent);
    assert_eq!(back.memory_percent, s.memory_percent);
    assert_eq!(back.memory_total, s.memory_total);
    assert_eq!(back.memory_available, s.memory_available);
    assert_eq!(back.disk_usage, s.disk_usage);
    // Second precision survives the text column.
    assert_eq!(format_ts(&back.timestamp), format_ts(&s.timestamp));
}

#[test]
fn test_statistics_no_data_is_none() {
    let (_dir, store) = scratch_store();
    assert!(store.get_statistics("h1", 24).unwrap().is_none());

    store.save(&sample("other-host", 10.0, 5)).unwrap();
    assert!(store.get_statistics("h1", 24).unwrap().is_none());
}

#[test]
fn test_statistics_aggregates_window() {
    let (_dir, store) = scratch_store();
    for (cpu, minutes_ago) in [(10.0, 30), (90.0, 20), (50.0, 10)] {
        store.save(&sample("h1", cpu, minutes_ago)).unwrap();
    }

    let report = store.get_statistics("h1", 24).unwrap().unwrap();
    assert_eq!(report.count, 3);
    assert_eq!(report.cpu.avg, 50.0);
    assert_eq!(report.cpu.min, 10.0);
    assert_eq!(report.cpu.max, 90.0);
    assert_eq!(report.memory.avg, 50.0);

    // Store-backed reports carry the query cutoff.
    let window_start = report.window_start.unwrap();
    assert!(window_start <= Utc::now() - Duration::hours(23));
    assert!(window_start >= Utc::now() - Duration::hours(25));
}

#[test]
fn test_statistics_excludes_rows_outside_window() {
    let (_dir, store) = scratch_store();
    store.save(&sample("h1", 100.0, 3 * 60)).unwrap();
    store.save(&sample("h1", 20.0, 10)).unwrap();

    let report = store.get_statistics("h1", 1).unwrap().unwrap();
    assert_eq!(report.count, 1);
    assert_eq!(report.cpu.avg, 20.0);
}

#[test]
fn test_cleanup_old_removes_only_stale_rows() {
    let (_dir, store) = scratch_store();
    store.save(&sample("h1", 10.0, 40 * 24 * 60)).unwrap();
    store.save(&sample("h1", 20.0, 35 * 24 * 60)).unwrap();
    store.save(&sample("h1", 30.0, 24 * 60)).unwrap();

    assert_eq!(store.cleanup_old(30).unwrap(), 2);
    // Idempotent: nothing stale remains.
    assert_eq!(store.cleanup_old(30).unwrap(), 0);

    let rows = store.get_latest("h1", 10).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].cpu_percent, 30.0);
}

#[test]
fn test_out_of_range_values_stored_verbatim() {
    let (_dir, store) = scratch_store();
    store.save(&sample("h1", 250.0, 5)).unwrap();

    let rows = store.get_latest("h1", 1).unwrap();
    assert_eq!(rows[0].cpu_percent, 250.0);
}

#[test]
fn test_timestamp_text_round_trip() {
    let ts = parse_ts("2026-03-14T09:26:53").unwrap();
    assert_eq!(format_ts(&ts), "2026-03-14T09:26:53");
    assert!(parse_ts("not-a-timestamp").is_err());
}

#[test]
fn test_close_consumes_store() {
    let (_dir, store) = scratch_store();
    store.save(&sample("h1", 10.0, 5)).unwrap();
    store.close();
}
