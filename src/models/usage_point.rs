use chrono::NaiveDateTime;

/// One row of the `quota_vw` view: a reading joined to its month's quota.
#[derive(Debug, Clone, PartialEq)]
pub struct UsagePoint {
    pub timestamp: NaiveDateTime,
    pub remaining: i64,
    pub total: i64,
    /// `remaining / total * 100`; `None` when the month's quota is zero.
    pub percent: Option<f64>,
}
