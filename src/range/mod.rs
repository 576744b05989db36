//! Date ranges, the viewer's calendar zone, and range reconciliation.
//!
//! Ranges are inclusive on both ends and are compared by *calendar day* in the
//! viewer's zone, never by raw instant. Two ranges that start at 23:00 and 00:00 on
//! the same local day are the same range for caching purposes.

mod error;
mod preset;
mod reconcile;

pub use error::RangeError;
pub use preset::RangePreset;
pub use reconcile::{reconcile, FilteredCollections};

use crate::gateway::filter::{FilterExpr, FilterOp};
use crate::records::Collection;
use chrono::{
    DateTime, FixedOffset, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The zone calendar days are evaluated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalendarZone {
    /// The process's local zone
    #[default]
    Local,
    Fixed(FixedOffset),
}

impl CalendarZone {
    /// Calendar date of `instant` in this zone.
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        match self {
            CalendarZone::Local => instant.with_timezone(&Local).date_naive(),
            CalendarZone::Fixed(offset) => instant.with_timezone(offset).date_naive(),
        }
    }

    /// The instant of a wall-clock time in this zone.
    ///
    /// Times that fall in a DST gap resolve to the UTC reading of the same wall clock.
    pub fn instant(&self, naive: NaiveDateTime) -> DateTime<Utc> {
        let resolved = match self {
            CalendarZone::Local => earliest(Local.from_local_datetime(&naive)),
            CalendarZone::Fixed(offset) => earliest(offset.from_local_datetime(&naive)),
        };
        resolved.unwrap_or_else(|| naive.and_utc())
    }

    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        self.instant(date.and_time(NaiveTime::MIN))
    }

    /// 23:59:59.999 on `date`.
    pub fn end_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        let last_ms = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
        self.instant(date.and_time(last_ms))
    }

    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        self.local_date(now)
    }
}

fn earliest<Tz: TimeZone>(result: LocalResult<DateTime<Tz>>) -> Option<DateTime<Utc>> {
    match result {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => Some(dt.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}

/// An inclusive `[start, end]` range of instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, RangeError> {
        if start > end {
            return Err(RangeError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// Whole calendar days: 00:00:00.000 on `first` through 23:59:59.999 on `last`.
    pub fn from_days(
        zone: CalendarZone,
        first: NaiveDate,
        last: NaiveDate,
    ) -> Result<Self, RangeError> {
        Self::new(zone.start_of_day(first), zone.end_of_day(last))
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    pub fn start_date(&self, zone: CalendarZone) -> NaiveDate {
        zone.local_date(self.start)
    }

    pub fn end_date(&self, zone: CalendarZone) -> NaiveDate {
        zone.local_date(self.end)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// Parse a `YYYY-MM-DD` calendar day.
pub fn parse_day(s: &str) -> Result<NaiveDate, RangeError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| RangeError::InvalidDate(s.to_string()))
}

/// Resolve a user's range selection: a preset name, or explicit first and last days.
///
/// Nothing selected means no range (an unfiltered load).
pub fn resolve_selection(
    start: Option<&str>,
    end: Option<&str>,
    preset: Option<&str>,
    zone: CalendarZone,
    now: DateTime<Utc>,
) -> Result<Option<DateRange>, RangeError> {
    match (start, end, preset) {
        (None, None, None) => Ok(None),
        (None, None, Some(preset)) => Ok(Some(preset.parse::<RangePreset>()?.resolve(zone, now))),
        (_, _, Some(_)) => Err(RangeError::Conflicting),
        (Some(start), Some(end), None) => {
            DateRange::from_days(zone, parse_day(start)?, parse_day(end)?).map(Some)
        }
        _ => Err(RangeError::Incomplete),
    }
}

/// True iff both ranges exist and agree on start day and end day in `zone`.
pub fn ranges_equal_by_calendar_day(
    a: Option<&DateRange>,
    b: Option<&DateRange>,
    zone: CalendarZone,
) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => {
            a.start_date(zone) == b.start_date(zone) && a.end_date(zone) == b.end_date(zone)
        }
        _ => false,
    }
}

/// Like [`ranges_equal_by_calendar_day`], but two absent ranges also match.
///
/// Used to decide whether a stored snapshot answers a request: an unfiltered
/// snapshot satisfies an unfiltered request.
pub fn same_range(a: Option<&DateRange>, b: Option<&DateRange>, zone: CalendarZone) -> bool {
    match (a, b) {
        (None, None) => true,
        _ => ranges_equal_by_calendar_day(a, b, zone),
    }
}

/// Gateway `where` expression restricting `collection` to `range`.
///
/// `None` when no range is given or the collection has no date field.
pub fn build_filter_expression(
    range: Option<&DateRange>,
    collection: Collection,
    zone: CalendarZone,
) -> Option<FilterExpr> {
    let range = range?;
    let field = collection.date_field()?;

    Some(
        FilterExpr::exact_date(field, FilterOp::Gte, range.start_date(zone))
            .and(FilterExpr::exact_date(field, FilterOp::Lte, range.end_date(zone))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn est() -> CalendarZone {
        CalendarZone::Fixed(FixedOffset::west_opt(5 * 3600).unwrap())
    }

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_new_rejects_inverted() {
        let result = DateRange::new(at("2024-06-02T00:00:00Z"), at("2024-06-01T00:00:00Z"));
        assert!(matches!(result, Err(RangeError::Inverted { .. })));
    }

    #[test]
    fn test_from_days_covers_whole_local_days() {
        let range = DateRange::from_days(est(), day(2024, 6, 1), day(2024, 6, 1)).unwrap();
        assert_eq!(range.start, at("2024-06-01T05:00:00Z"));
        assert_eq!(range.end, at("2024-06-02T04:59:59.999Z"));
        assert!(range.contains(at("2024-06-02T04:00:00Z")));
        assert!(!range.contains(at("2024-06-02T05:00:00Z")));
    }

    #[test]
    fn test_calendar_day_equality_ignores_time_of_day() {
        // 23:00 and 23:59:59 local on March 1st, versus other instants on the same local day
        let a = DateRange::new(
            at("2024-03-01T23:00:00-05:00"),
            at("2024-03-01T23:59:59-05:00"),
        )
        .unwrap();
        let b = DateRange::new(
            at("2024-03-01T05:00:00Z"),
            at("2024-03-02T00:00:00Z"),
        )
        .unwrap();

        assert_ne!(a, b);
        assert!(ranges_equal_by_calendar_day(Some(&a), Some(&b), est()));
    }

    #[test]
    fn test_calendar_day_equality_depends_on_zone() {
        let a = DateRange::new(at("2024-03-02T03:00:00Z"), at("2024-03-02T03:00:00Z")).unwrap();
        let b = DateRange::new(at("2024-03-02T12:00:00Z"), at("2024-03-02T12:00:00Z")).unwrap();

        let utc = CalendarZone::Fixed(FixedOffset::east_opt(0).unwrap());
        assert!(ranges_equal_by_calendar_day(Some(&a), Some(&b), utc));
        // 03:00Z is still March 1st at UTC-5
        assert!(!ranges_equal_by_calendar_day(Some(&a), Some(&b), est()));
    }

    #[test]
    fn test_absent_ranges() {
        let a = DateRange::from_days(est(), day(2024, 6, 1), day(2024, 6, 7)).unwrap();
        assert!(!ranges_equal_by_calendar_day(None, None, est()));
        assert!(!ranges_equal_by_calendar_day(Some(&a), None, est()));
        assert!(same_range(None, None, est()));
        assert!(!same_range(None, Some(&a), est()));
        assert!(same_range(Some(&a), Some(&a), est()));
    }

    #[test]
    fn test_build_filter_expression_uses_local_dates() {
        // Late evening June 7th local is already June 8th in UTC
        let range = DateRange::new(
            at("2024-06-01T00:00:00-05:00"),
            at("2024-06-07T23:30:00-05:00"),
        )
        .unwrap();

        let expr = build_filter_expression(Some(&range), Collection::Contacts, est()).unwrap();
        assert_eq!(
            expr.as_str(),
            "(Fecha y hora de creación,gte,exactDate,2024-06-01)~and(Fecha y hora de creación,lte,exactDate,2024-06-07)"
        );

        let expr = build_filter_expression(Some(&range), Collection::Attempts, est()).unwrap();
        assert!(expr.as_str().starts_with("(Fecha del Intento,gte,"));
    }

    #[test]
    fn test_build_filter_expression_none_cases() {
        let range = DateRange::from_days(est(), day(2024, 6, 1), day(2024, 6, 7)).unwrap();
        assert!(build_filter_expression(Some(&range), Collection::Sellers, est()).is_none());
        assert!(build_filter_expression(None, Collection::Sales, est()).is_none());
    }

    #[test]
    fn test_resolve_selection() {
        let now = at("2024-06-07T15:00:00Z");

        assert_eq!(resolve_selection(None, None, None, est(), now), Ok(None));

        let explicit = resolve_selection(Some("2024-06-01"), Some("2024-06-07"), None, est(), now)
            .unwrap()
            .unwrap();
        assert_eq!(explicit.start_date(est()), day(2024, 6, 1));
        assert_eq!(explicit.end_date(est()), day(2024, 6, 7));

        let preset = resolve_selection(None, None, Some("today"), est(), now)
            .unwrap()
            .unwrap();
        assert_eq!(preset.start_date(est()), day(2024, 6, 7));
    }

    #[test]
    fn test_resolve_selection_errors() {
        let now = at("2024-06-07T15:00:00Z");

        assert_eq!(
            resolve_selection(Some("2024-06-01"), None, None, est(), now),
            Err(RangeError::Incomplete)
        );
        assert_eq!(
            resolve_selection(Some("2024-06-01"), Some("2024-06-02"), Some("today"), est(), now),
            Err(RangeError::Conflicting)
        );
        assert!(matches!(
            resolve_selection(Some("2024-06-09"), Some("2024-06-02"), None, est(), now),
            Err(RangeError::Inverted { .. })
        ));
        assert_eq!(
            resolve_selection(None, None, Some("fortnight"), est(), now),
            Err(RangeError::UnknownPreset("fortnight".to_string()))
        );
        assert!(matches!(
            resolve_selection(Some("06/01/2024"), Some("2024-06-02"), None, est(), now),
            Err(RangeError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_parse_day() {
        assert_eq!(parse_day(" 2024-06-01 ").unwrap(), day(2024, 6, 1));
        assert!(matches!(parse_day("06/01/2024"), Err(RangeError::InvalidDate(_))));
        assert!(parse_day("2024-02-30").is_err());
    }

    proptest! {
        #[test]
        fn prop_any_instants_on_same_local_days_are_equal(
            offset_hours in -11i32..=12,
            start_secs_a in 0u32..86_400,
            start_secs_b in 0u32..86_400,
            end_secs_a in 0u32..86_400,
            end_secs_b in 0u32..86_400,
            span_days in 0i64..40,
        ) {
            let zone = CalendarZone::Fixed(FixedOffset::east_opt(offset_hours * 3600).unwrap());
            let first = day(2024, 3, 1);
            let last = first + chrono::Duration::days(span_days);

            let instant = |date: NaiveDate, secs: u32| {
                zone.instant(date.and_time(NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).unwrap()))
            };

            let a = DateRange {
                start: instant(first, start_secs_a),
                end: instant(last, end_secs_a),
            };
            let b = DateRange {
                start: instant(first, start_secs_b),
                end: instant(last, end_secs_b),
            };

            prop_assert!(ranges_equal_by_calendar_day(Some(&a), Some(&b), zone));
            prop_assert!(ranges_equal_by_calendar_day(Some(&b), Some(&a), zone));
        }

        #[test]
        fn prop_different_end_day_is_not_equal(
            offset_hours in -11i32..=12,
            secs in 0u32..86_400,
            extra_days in 1i64..10,
        ) {
            let zone = CalendarZone::Fixed(FixedOffset::east_opt(offset_hours * 3600).unwrap());
            let first = day(2024, 6, 1);
            let t = NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).unwrap();
            let a = DateRange {
                start: zone.instant(first.and_time(t)),
                end: zone.instant(first.and_time(t)),
            };
            let b = DateRange {
                start: a.start,
                end: zone.instant((first + chrono::Duration::days(extra_days)).and_time(t)),
            };

            prop_assert!(!ranges_equal_by_calendar_day(Some(&a), Some(&b), zone));
        }
    }
}
