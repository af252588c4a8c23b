mod schema;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection};
use std::path::Path;

use crate::models::{
    format_ts, parse_ts, BillingCycle, MonthlyQuota, QuotaSample, Reading, UsagePoint,
};

pub(crate) struct Database {
    conn: Connection,
    cycle: BillingCycle,
}

impl Database {
    pub(crate) fn open(path: &Path, cycle: BillingCycle) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .context("Failed to set database pragmas")?;
        let mut db = Self { conn, cycle };
        db.migrate().context("Database migration failed")?;
        db.create_view()?;
        Ok(db)
    }

    #[cfg(test)]
    pub(crate) fn open_in_memory(cycle: BillingCycle) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let mut db = Self { conn, cycle };
        db.migrate()?;
        db.create_view()?;
        Ok(db)
    }

    fn migrate(&mut self) -> Result<()> {
        // Check if schema_version table exists
        let has_version_table: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            [],
            |row| row.get(0),
        )?;

        if !has_version_table {
            // Fresh database - apply full schema
            self.conn.execute_batch(schema::SCHEMA_V1)?;
            self.conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![schema::CURRENT_VERSION],
            )?;
            return Ok(());
        }

        // Existing database - check version and apply migrations
        let current: i32 = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0);

        for &(from_version, sql) in schema::MIGRATIONS {
            if current <= from_version {
                self.conn.execute_batch(sql)?;
            }
        }

        if current < schema::CURRENT_VERSION {
            self.conn.execute(
                "UPDATE schema_version SET version = ?1",
                params![schema::CURRENT_VERSION],
            )?;
        }

        Ok(())
    }

    /// (Re)create `quota_vw`. The join expression bakes in the billing cycle
    /// day, so the view is rebuilt on every open to track configuration.
    fn create_view(&mut self) -> Result<()> {
        self.conn
            .execute_batch(&format!(
                "DROP VIEW IF EXISTS quota_vw; {}",
                schema::quota_view_sql(self.cycle.start_day())
            ))
            .context("Failed to create quota_vw")?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn cycle(&self) -> BillingCycle {
        self.cycle
    }

    // ── Store ─────────────────────────────────────────────────

    /// Upsert one history reading. Re-fetching an already-stored timestamp
    /// overwrites the previous value: the API may legitimately refine a
    /// count on re-poll, and losing one stale point is cheaper than
    /// failing the whole update.
    pub(crate) fn record_reading(&self, reading: &Reading) -> Result<()> {
        validate_timestamp(reading.timestamp)?;
        self.conn.execute(
            "INSERT INTO quota_history (timestamp, remaining) VALUES (?1, ?2)
             ON CONFLICT(timestamp) DO UPDATE SET remaining = excluded.remaining",
            params![format_ts(reading.timestamp), reading.remaining],
        )?;
        Ok(())
    }

    /// Upsert one month's allotment. Overwrites any existing figure for the
    /// month so the ISP can correct the current month's value.
    pub(crate) fn record_monthly_quota(&self, month_start: NaiveDateTime, quota: i64) -> Result<()> {
        validate_timestamp(month_start)?;
        let aligned = self.cycle.month_start(month_start);
        anyhow::ensure!(
            aligned == month_start,
            "Month start {} is not aligned to the billing cycle (expected {})",
            format_ts(month_start),
            format_ts(aligned),
        );
        anyhow::ensure!(quota >= 0, "Monthly quota cannot be negative: {quota}");
        self.conn.execute(
            "INSERT INTO quota_monthly (month_start, quota) VALUES (?1, ?2)
             ON CONFLICT(month_start) DO UPDATE SET quota = excluded.quota",
            params![format_ts(month_start), quota],
        )?;
        Ok(())
    }

    /// Store one fetched sample: the reading itself, plus the month's
    /// allotment filed under the billing month the reading falls in.
    ///
    /// The two upserts are deliberately independent; the view tolerates a
    /// reading whose month has not been recorded yet.
    pub(crate) fn save_sample(&self, sample: &QuotaSample) -> Result<()> {
        self.record_reading(&sample.reading())?;
        let month_start = self.cycle.month_start(sample.timestamp);
        self.record_monthly_quota(month_start, sample.total)?;
        Ok(())
    }

    // ── Query layer ───────────────────────────────────────────

    /// View rows with `timestamp` in the inclusive range, ascending.
    /// `None` bounds are open-ended.
    pub(crate) fn query_view(
        &self,
        from: Option<NaiveDateTime>,
        to: Option<NaiveDateTime>,
    ) -> Result<Vec<UsagePoint>> {
        let mut sql =
            String::from("SELECT timestamp, remaining, total, percent FROM quota_vw WHERE 1=1");
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(from) = from {
            sql.push_str(&format!(" AND timestamp >= ?{}", param_values.len() + 1));
            param_values.push(Box::new(format_ts(from)));
        }
        if let Some(to) = to {
            sql.push_str(&format!(" AND timestamp <= ?{}", param_values.len() + 1));
            param_values.push(Box::new(format_ts(to)));
        }

        sql.push_str(" ORDER BY timestamp ASC");

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_ref.as_slice(), |row| {
            Ok(UsagePoint {
                timestamp: read_ts(row, 0)?,
                remaining: row.get(1)?,
                total: row.get(2)?,
                percent: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Newest view row, if any.
    pub(crate) fn latest_point(&self) -> Result<Option<UsagePoint>> {
        let result = self.conn.query_row(
            "SELECT timestamp, remaining, total, percent FROM quota_vw
             ORDER BY timestamp DESC LIMIT 1",
            [],
            |row| {
                Ok(UsagePoint {
                    timestamp: read_ts(row, 0)?,
                    remaining: row.get(1)?,
                    total: row.get(2)?,
                    percent: row.get(3)?,
                })
            },
        );
        match result {
            Ok(p) => Ok(Some(p)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Newest history timestamp, matched or not. Used for the polite
    /// minimum-interval check before hitting the API.
    pub(crate) fn latest_timestamp(&self) -> Result<Option<NaiveDateTime>> {
        let max: Option<String> =
            self.conn
                .query_row("SELECT MAX(timestamp) FROM quota_history", [], |row| {
                    row.get(0)
                })?;
        match max {
            Some(s) => {
                let ts = parse_ts(&s).with_context(|| format!("Corrupt timestamp in store: {s}"))?;
                Ok(Some(ts))
            }
            None => Ok(None),
        }
    }

    pub(crate) fn monthly_quotas(&self) -> Result<Vec<MonthlyQuota>> {
        let mut stmt = self
            .conn
            .prepare("SELECT month_start, quota FROM quota_monthly ORDER BY month_start")?;
        let rows = stmt.query_map([], |row| {
            Ok(MonthlyQuota {
                month_start: read_ts(row, 0)?,
                quota: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}

fn read_ts(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let s: String = row.get(idx)?;
    parse_ts(&s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Reject timestamps that cannot be real readings before they reach the
/// tables: anything before the epoch floor or more than a day ahead of the
/// local clock.
fn validate_timestamp(ts: NaiveDateTime) -> Result<()> {
    let floor = NaiveDate::from_ymd_opt(2000, 1, 1)
        .unwrap_or_default()
        .and_time(chrono::NaiveTime::MIN);
    let ceiling = chrono::Local::now().naive_local() + chrono::Duration::days(1);
    anyhow::ensure!(
        ts >= floor && ts <= ceiling,
        "Timestamp out of range: {}",
        format_ts(ts)
    );
    Ok(())
}

#[cfg(test)]
mod tests;
