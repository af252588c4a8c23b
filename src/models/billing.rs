use anyhow::Result;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};

/// Billing month boundary rule. The ISP aligns quota resets to a calendar
/// day of the month, which is not necessarily the 1st.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingCycle {
    start_day: u32,
}

impl BillingCycle {
    pub fn new(start_day: u32) -> Result<Self> {
        anyhow::ensure!(
            (1..=31).contains(&start_day),
            "Billing cycle start day must be 1-31, got {start_day}"
        );
        Ok(Self { start_day })
    }

    pub fn start_day(&self) -> u32 {
        self.start_day
    }

    /// First instant of the billing month containing `ts`.
    ///
    /// The cycle day is clamped to the length of the month, so a cycle
    /// starting on the 31st begins on Feb 28th (29th in leap years).
    pub fn month_start(&self, ts: NaiveDateTime) -> NaiveDateTime {
        let date = ts.date();
        let this_cycle = self.cycle_date(date.year(), date.month());
        let start = if date >= this_cycle {
            this_cycle
        } else {
            let (year, month) = previous_month(date.year(), date.month());
            self.cycle_date(year, month)
        };
        start.and_time(NaiveTime::MIN)
    }

    fn cycle_date(&self, year: i32, month: u32) -> NaiveDate {
        let day = self.start_day.min(days_in_month(year, month));
        // Day is clamped into the month's valid range, so this is always Some.
        NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
    }
}

fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}
