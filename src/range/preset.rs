//! Named ranges offered by the dashboard's date picker.

use super::{CalendarZone, DateRange, RangeError};
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangePreset {
    Today,
    Yesterday,
    /// Seven days back through today
    Last7Days,
    Last30Days,
    /// First of the current month through today
    ThisMonth,
    LastMonth,
    /// First of the month six months ago through today
    Last6Months,
}

impl RangePreset {
    pub const ALL: [RangePreset; 7] = [
        RangePreset::Today,
        RangePreset::Yesterday,
        RangePreset::Last7Days,
        RangePreset::Last30Days,
        RangePreset::ThisMonth,
        RangePreset::LastMonth,
        RangePreset::Last6Months,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RangePreset::Today => "today",
            RangePreset::Yesterday => "yesterday",
            RangePreset::Last7Days => "last_7_days",
            RangePreset::Last30Days => "last_30_days",
            RangePreset::ThisMonth => "this_month",
            RangePreset::LastMonth => "last_month",
            RangePreset::Last6Months => "last_6_months",
        }
    }

    /// Calendar days `(first, last)` covered relative to `today`.
    pub fn days(self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let first_of_month = today.with_day(1).unwrap_or(today);

        match self {
            RangePreset::Today => (today, today),
            RangePreset::Yesterday => {
                let yesterday = today - Duration::days(1);
                (yesterday, yesterday)
            }
            RangePreset::Last7Days => (today - Duration::days(7), today),
            RangePreset::Last30Days => (today - Duration::days(30), today),
            RangePreset::ThisMonth => (first_of_month, today),
            RangePreset::LastMonth => {
                let last = first_of_month - Duration::days(1);
                (last.with_day(1).unwrap_or(last), last)
            }
            RangePreset::Last6Months => (
                first_of_month
                    .checked_sub_months(Months::new(6))
                    .unwrap_or(first_of_month),
                today,
            ),
        }
    }

    pub fn resolve(self, zone: CalendarZone, now: DateTime<Utc>) -> DateRange {
        let (first, last) = self.days(zone.today(now));
        DateRange {
            start: zone.start_of_day(first),
            end: zone.end_of_day(last),
        }
    }
}

impl fmt::Display for RangePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RangePreset {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        match normalized.as_str() {
            "week" => Ok(RangePreset::Last7Days),
            "month" => Ok(RangePreset::ThisMonth),
            other => RangePreset::ALL
                .into_iter()
                .find(|p| p.as_str() == other)
                .ok_or_else(|| RangeError::UnknownPreset(s.to_string())),
        }
    }
}
