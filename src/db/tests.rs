#![allow(clippy::unwrap_used)]

use super::*;

fn ts(s: &str) -> NaiveDateTime {
    parse_ts(s).unwrap()
}

fn open(cycle_day: u32) -> Database {
    Database::open_in_memory(BillingCycle::new(cycle_day).unwrap()).unwrap()
}

fn reading(s: &str, remaining: i64) -> Reading {
    Reading {
        timestamp: ts(s),
        remaining,
    }
}

// ── View join semantics ───────────────────────────────────────

#[test]
fn test_view_joins_reading_to_month() {
    let db = open(1);
    db.record_monthly_quota(ts("2023-01-01 00:00:00"), 100).unwrap();
    db.record_reading(&reading("2023-01-15 00:00:00", 40)).unwrap();

    let rows = db.query_view(None, None).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].timestamp, ts("2023-01-15 00:00:00"));
    assert_eq!(rows[0].remaining, 40);
    assert_eq!(rows[0].total, 100);
    let percent = rows[0].percent.unwrap();
    assert!((percent - 40.0).abs() < 1e-9);
}

#[test]
fn test_percent_avoids_integer_truncation() {
    let db = open(1);
    db.record_monthly_quota(ts("2023-01-01 00:00:00"), 3).unwrap();
    db.record_reading(&reading("2023-01-15 00:00:00", 1)).unwrap();

    let rows = db.query_view(None, None).unwrap();
    let percent = rows[0].percent.unwrap();
    assert!((percent - 100.0 / 3.0).abs() < 1e-9);
}

#[test]
fn test_reading_without_month_is_absent() {
    let db = open(1);
    db.record_monthly_quota(ts("2023-01-01 00:00:00"), 100).unwrap();
    db.record_reading(&reading("2023-01-15 00:00:00", 40)).unwrap();
    // February reading with no February quota row.
    db.record_reading(&reading("2023-02-01 00:00:00", 90)).unwrap();

    let rows = db.query_view(None, None).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].timestamp, ts("2023-01-15 00:00:00"));

    // Backfilling the month makes the reading appear.
    db.record_monthly_quota(ts("2023-02-01 00:00:00"), 200).unwrap();
    let rows = db.query_view(None, None).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].total, 200);
}

#[test]
fn test_zero_quota_yields_null_percent() {
    let db = open(1);
    db.record_monthly_quota(ts("2023-01-01 00:00:00"), 0).unwrap();
    db.record_reading(&reading("2023-01-15 00:00:00", 40)).unwrap();

    let rows = db.query_view(None, None).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].percent, None);
}

#[test]
fn test_view_ordering_and_inclusive_range() {
    let db = open(1);
    db.record_monthly_quota(ts("2023-01-01 00:00:00"), 100).unwrap();
    // Insert out of order; the store does not require ordered appends.
    db.record_reading(&reading("2023-01-20 00:00:00", 20)).unwrap();
    db.record_reading(&reading("2023-01-10 00:00:00", 80)).unwrap();
    db.record_reading(&reading("2023-01-15 00:00:00", 50)).unwrap();

    let rows = db.query_view(None, None).unwrap();
    let stamps: Vec<_> = rows.iter().map(|p| p.timestamp).collect();
    assert_eq!(
        stamps,
        vec![
            ts("2023-01-10 00:00:00"),
            ts("2023-01-15 00:00:00"),
            ts("2023-01-20 00:00:00"),
        ]
    );

    // Both bounds are inclusive.
    let rows = db
        .query_view(
            Some(ts("2023-01-10 00:00:00")),
            Some(ts("2023-01-15 00:00:00")),
        )
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].timestamp, ts("2023-01-10 00:00:00"));
    assert_eq!(rows[1].timestamp, ts("2023-01-15 00:00:00"));

    let rows = db.query_view(Some(ts("2023-01-16 00:00:00")), None).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].timestamp, ts("2023-01-20 00:00:00"));
}

// ── Overwrite policies ────────────────────────────────────────

#[test]
fn test_refetched_reading_overwrites() {
    let db = open(1);
    db.record_monthly_quota(ts("2023-01-01 00:00:00"), 100).unwrap();
    db.record_reading(&reading("2023-01-15 00:00:00", 40)).unwrap();
    db.record_reading(&reading("2023-01-15 00:00:00", 38)).unwrap();

    let rows = db.query_view(None, None).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].remaining, 38);
}

#[test]
fn test_monthly_quota_overwrites() {
    let db = open(1);
    db.record_monthly_quota(ts("2023-01-01 00:00:00"), 100).unwrap();
    db.record_monthly_quota(ts("2023-01-01 00:00:00"), 150).unwrap();

    let months = db.monthly_quotas().unwrap();
    assert_eq!(months.len(), 1);
    assert_eq!(months[0].quota, 150);
}

// ── Billing cycle alignment ───────────────────────────────────

#[test]
fn test_view_honours_cycle_day() {
    let db = open(10);
    // Jan 5th belongs to the cycle that started Dec 10th.
    db.record_reading(&reading("2023-01-05 08:00:00", 70)).unwrap();
    // Jan 15th belongs to the cycle that started Jan 10th.
    db.record_reading(&reading("2023-01-15 08:00:00", 90)).unwrap();
    db.record_monthly_quota(ts("2022-12-10 00:00:00"), 100).unwrap();
    db.record_monthly_quota(ts("2023-01-10 00:00:00"), 120).unwrap();

    let rows = db.query_view(None, None).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].total, 100);
    assert_eq!(rows[1].total, 120);
}

#[test]
fn test_view_clamps_cycle_day_like_billing_cycle() {
    let db = open(31);
    // Feb 2023: cycle day clamps to the 28th.
    db.record_reading(&reading("2023-02-15 00:00:00", 50)).unwrap();
    db.record_reading(&reading("2023-02-28 12:00:00", 30)).unwrap();
    db.record_monthly_quota(ts("2023-01-31 00:00:00"), 100).unwrap();
    db.record_monthly_quota(ts("2023-02-28 00:00:00"), 200).unwrap();

    let rows = db.query_view(None, None).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].timestamp, ts("2023-02-15 00:00:00"));
    assert_eq!(rows[0].total, 100);
    assert_eq!(rows[1].timestamp, ts("2023-02-28 12:00:00"));
    assert_eq!(rows[1].total, 200);
}

#[test]
fn test_sql_truncation_matches_rust_for_sampled_dates() {
    // The SQL expression and BillingCycle::month_start must agree exactly,
    // or matched readings silently vanish from the view.
    for cycle_day in [1, 10, 28, 29, 30, 31] {
        let db = open(cycle_day);
        let cycle = db.cycle();
        let samples = [
            "2023-01-01 00:00:00",
            "2023-01-31 23:59:59",
            "2023-02-01 00:00:00",
            "2023-02-28 00:00:00",
            "2024-02-29 10:00:00",
            "2023-04-30 00:00:00",
            "2023-12-31 18:00:00",
        ];
        for s in samples {
            db.record_reading(&reading(s, 1)).unwrap();
            db.record_monthly_quota(cycle.month_start(ts(s)), 100).unwrap();
        }
        let rows = db.query_view(None, None).unwrap();
        assert_eq!(rows.len(), samples.len(), "cycle day {cycle_day}");
    }
}

#[test]
fn test_misaligned_month_start_rejected() {
    let db = open(10);
    let err = db
        .record_monthly_quota(ts("2023-01-01 00:00:00"), 100)
        .unwrap_err();
    assert!(err.to_string().contains("not aligned"));
}

// ── Store boundaries ──────────────────────────────────────────

#[test]
fn test_out_of_range_timestamps_rejected() {
    let db = open(1);
    assert!(db.record_reading(&reading("1999-12-31 23:59:59", 40)).is_err());
    assert!(db.record_reading(&reading("2999-01-01 00:00:00", 40)).is_err());
    // Nothing reached the table.
    assert!(db.latest_timestamp().unwrap().is_none());
}

#[test]
fn test_negative_quota_rejected() {
    let db = open(1);
    assert!(db
        .record_monthly_quota(ts("2023-01-01 00:00:00"), -1)
        .is_err());
}

#[test]
fn test_save_sample_populates_both_tables() {
    let db = open(1);
    let sample = QuotaSample {
        timestamp: ts("2023-01-15 06:00:00"),
        remaining: 40,
        total: 100,
    };
    db.save_sample(&sample).unwrap();

    let months = db.monthly_quotas().unwrap();
    assert_eq!(months.len(), 1);
    assert_eq!(months[0].month_start, ts("2023-01-01 00:00:00"));
    assert_eq!(months[0].quota, 100);

    let rows = db.query_view(None, None).unwrap();
    assert_eq!(rows.len(), 1);
    assert!((rows[0].percent.unwrap() - 40.0).abs() < 1e-9);
}

#[test]
fn test_latest_timestamp_and_point() {
    let db = open(1);
    assert!(db.latest_timestamp().unwrap().is_none());
    assert!(db.latest_point().unwrap().is_none());

    db.record_reading(&reading("2023-01-10 00:00:00", 80)).unwrap();
    db.record_reading(&reading("2023-01-15 00:00:00", 40)).unwrap();
    assert_eq!(
        db.latest_timestamp().unwrap(),
        Some(ts("2023-01-15 00:00:00"))
    );
    // No month recorded yet: a latest reading exists but no view row.
    assert!(db.latest_point().unwrap().is_none());

    db.record_monthly_quota(ts("2023-01-01 00:00:00"), 100).unwrap();
    let point = db.latest_point().unwrap().unwrap();
    assert_eq!(point.timestamp, ts("2023-01-15 00:00:00"));
    assert_eq!(point.remaining, 40);
}

// ── Persistence ───────────────────────────────────────────────

#[test]
fn test_reopen_preserves_data_and_rebuilds_view() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");

    {
        let db = Database::open(&path, BillingCycle::new(1).unwrap()).unwrap();
        db.record_reading(&reading("2023-01-15 00:00:00", 40)).unwrap();
        db.record_monthly_quota(ts("2023-01-01 00:00:00"), 100).unwrap();
    }

    // Reopening with a different cycle day rebuilds the view; the January
    // reading no longer matches a month aligned to day 10.
    {
        let db = Database::open(&path, BillingCycle::new(10).unwrap()).unwrap();
        assert_eq!(db.latest_timestamp().unwrap(), Some(ts("2023-01-15 00:00:00")));
        assert!(db.query_view(None, None).unwrap().is_empty());
    }

    // And back to calendar months: the stored rows never went anywhere.
    {
        let db = Database::open(&path, BillingCycle::new(1).unwrap()).unwrap();
        assert_eq!(db.query_view(None, None).unwrap().len(), 1);
    }
}
