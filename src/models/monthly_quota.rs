use chrono::NaiveDateTime;

/// Total allotment for one billing month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyQuota {
    /// First instant of the billing month.
    pub month_start: NaiveDateTime,
    /// Bytes allotted for the month. Fixed once the ISP reports it, but
    /// the current month's figure may be corrected on a later fetch.
    pub quota: i64,
}
