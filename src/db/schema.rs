pub(crate) const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS quota_history (
    timestamp  TEXT PRIMARY KEY,
    remaining  INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS quota_monthly (
    month_start  TEXT PRIMARY KEY,
    quota        INTEGER NOT NULL
);
"#;

pub(crate) const CURRENT_VERSION: i32 = 1;

/// Migrations from version N to N+1.
/// Each entry is (from_version, sql).
pub(crate) const MIGRATIONS: &[(i32, &str)] = &[];

/// SQL expression truncating the TEXT datetime `col` to the first instant
/// of the billing month that starts on `cycle_day`.
///
/// Must agree exactly with `BillingCycle::month_start`, including the
/// clamping of the cycle day to the month's length, since the view join
/// relies on string equality against `quota_monthly.month_start`.
pub(crate) fn month_start_expr(col: &str, cycle_day: u32) -> String {
    if cycle_day == 1 {
        return format!("datetime({col}, 'start of month')");
    }
    // Last day of the month containing the timestamp, and of the month before.
    let this_len =
        format!("CAST(strftime('%d', date({col}, 'start of month', '+1 month', '-1 day')) AS INTEGER)");
    let prev_len = format!("CAST(strftime('%d', date({col}, 'start of month', '-1 day')) AS INTEGER)");
    format!(
        "CASE WHEN CAST(strftime('%d', {col}) AS INTEGER) >= MIN({cycle_day}, {this_len}) \
         THEN datetime({col}, 'start of month', '+' || (MIN({cycle_day}, {this_len}) - 1) || ' days') \
         ELSE datetime({col}, 'start of month', '-1 month', '+' || (MIN({cycle_day}, {prev_len}) - 1) || ' days') \
         END"
    )
}

/// DDL for the derived `quota_vw` view. Recreated on every open since the
/// join expression depends on the configured billing cycle day.
pub(crate) fn quota_view_sql(cycle_day: u32) -> String {
    let month_start = month_start_expr("h.timestamp", cycle_day);
    format!(
        "CREATE VIEW quota_vw AS \
         SELECT h.timestamp AS timestamp, \
                h.remaining AS remaining, \
                m.quota AS total, \
                CASE WHEN m.quota = 0 THEN NULL \
                     ELSE CAST(h.remaining AS REAL) / m.quota * 100.0 \
                END AS percent \
         FROM quota_history h \
         JOIN quota_monthly m ON m.month_start = {month_start}"
    )
}
