use chrono::NaiveDateTime;

use super::Reading;

/// One quota snapshot as produced by the fetcher: the reading itself plus
/// the month's total allotment reported alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaSample {
    pub timestamp: NaiveDateTime,
    pub remaining: i64,
    pub total: i64,
}

impl QuotaSample {
    /// The history half of the sample.
    pub fn reading(&self) -> Reading {
        Reading {
            timestamp: self.timestamp,
            remaining: self.remaining,
        }
    }
}
