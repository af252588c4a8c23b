mod billing;
mod monthly_quota;
mod reading;
mod sample;
mod usage_point;

pub use billing::BillingCycle;
pub use monthly_quota::MonthlyQuota;
pub use reading::Reading;
pub use sample::QuotaSample;
pub use usage_point::UsagePoint;

use chrono::NaiveDateTime;

/// Storage format for timestamps, matching the Chaos API's `quota-time`.
pub(crate) const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn format_ts(ts: NaiveDateTime) -> String {
    ts.format(DATETIME_FORMAT).to_string()
}

pub(crate) fn parse_ts(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
}
