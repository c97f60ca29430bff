//! Calendar bucketing for trend reports.
//!
//! A report period plus a reference date resolves to a *skeleton*: the complete,
//! ordered list of bucket keys the report must contain, and the half-open UTC range
//! `[start, end)` those buckets cover. Hour and date boundaries are taken in the
//! configured reporting offset, so the same offset must be used when the store
//! assigns samples to buckets (see [`BucketExpr::key_for`]).

use chrono::{
    DateTime, Datelike, Days, FixedOffset, Months, NaiveDate, NaiveTime, Timelike, Utc,
};
use serde::Serialize;
use std::fmt;

use crate::error::{AppError, Result};

pub const HOURS_PER_DAY: u32 = 24;
pub const DAYS_PER_WEEK: u64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
}

impl Period {
    /// How samples are grouped for this period.
    pub fn bucket_expr(self) -> BucketExpr {
        match self {
            Period::Daily => BucketExpr::HourOfDay,
            Period::Weekly | Period::Monthly => BucketExpr::Date,
        }
    }

    /// Parse the `date` query parameter for this period.
    ///
    /// Daily and weekly reports take `YYYY-MM-DD`. Monthly reports take `YYYY-MM`,
    /// and a full date is reduced to its month.
    pub fn parse_reference(self, raw: Option<&str>) -> Result<NaiveDate> {
        let raw = match raw.map(str::trim) {
            Some(s) if !s.is_empty() => s,
            _ => return Err(AppError::InvalidArgument(self.missing_date_message().into())),
        };

        match self {
            Period::Daily | Period::Weekly => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| {
                    AppError::InvalidArgument(format!(
                        "Invalid date {:?}, expected YYYY-MM-DD",
                        raw
                    ))
                }),
            Period::Monthly => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .or_else(|_| NaiveDate::parse_from_str(&format!("{}-01", raw), "%Y-%m-%d"))
                .ok()
                .and_then(|d| d.with_day(1))
                .ok_or_else(|| {
                    AppError::InvalidArgument(format!("Invalid month {:?}, expected YYYY-MM", raw))
                }),
        }
    }

    fn missing_date_message(self) -> &'static str {
        match self {
            Period::Daily => "Missing 'date' parameter.",
            Period::Weekly => "Date parameter is required (YYYY-MM-DD)",
            Period::Monthly => "Month parameter is required (YYYY-MM)",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Period::Daily => "daily",
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
        })
    }
}

/// Grouping applied to sample timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BucketExpr {
    HourOfDay,
    Date,
}

impl BucketExpr {
    pub fn key_for(self, ts: DateTime<Utc>, offset: FixedOffset) -> BucketKey {
        let local = ts.with_timezone(&offset);
        match self {
            BucketExpr::HourOfDay => BucketKey::Hour(local.hour()),
            BucketExpr::Date => BucketKey::Day(local.date_naive()),
        }
    }
}

/// Canonical identity of a bucket. Ordering follows the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BucketKey {
    Hour(u32),
    Day(NaiveDate),
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketKey::Hour(h) => write!(f, "{}:00", h),
            BucketKey::Day(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// Resolved report window: every bucket key plus the UTC range they cover.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketWindow {
    pub period: Period,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub keys: Vec<BucketKey>,
}

/// Ordered, gap-free bucket keys for `period` around `reference`.
pub fn build_skeleton(period: Period, reference: NaiveDate) -> Result<Vec<BucketKey>> {
    if period == Period::Daily {
        return Ok((0..HOURS_PER_DAY).map(BucketKey::Hour).collect());
    }

    let (first, end) = date_span(period, reference)?;
    Ok(first
        .iter_days()
        .take_while(|d| *d < end)
        .map(BucketKey::Day)
        .collect())
}

pub fn window(period: Period, reference: NaiveDate, offset: FixedOffset) -> Result<BucketWindow> {
    let (first, end) = date_span(period, reference)?;

    Ok(BucketWindow {
        period,
        start: local_midnight(first, offset)?,
        end: local_midnight(end, offset)?,
        keys: build_skeleton(period, reference)?,
    })
}

/// Monday of the ISO week containing `date`.
pub fn week_start(date: NaiveDate) -> Result<NaiveDate> {
    let back = u64::from(date.weekday().num_days_from_monday());
    date.checked_sub_days(Days::new(back)).ok_or_else(out_of_range)
}

/// Midnight of `date` in `offset`, as a UTC instant.
pub fn local_midnight(date: NaiveDate, offset: FixedOffset) -> Result<DateTime<Utc>> {
    date.and_time(NaiveTime::MIN)
        .and_local_timezone(offset)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(out_of_range)
}

/// First date of the period and the first date after it.
fn date_span(period: Period, reference: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
    let (first, end) = match period {
        Period::Daily => (Some(reference), reference.checked_add_days(Days::new(1))),
        Period::Weekly => {
            let monday = week_start(reference)?;
            (Some(monday), monday.checked_add_days(Days::new(DAYS_PER_WEEK)))
        }
        Period::Monthly => {
            let first = reference.with_day(1);
            (first, first.and_then(|d| d.checked_add_months(Months::new(1))))
        }
    };

    match (first, end) {
        (Some(first), Some(end)) => Ok((first, end)),
        _ => Err(out_of_range()),
    }
}

fn out_of_range() -> AppError {
    AppError::InvalidArgument("Date is out of the supported range".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Weekday};
    use pretty_assertions::assert_eq;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn labels(keys: &[BucketKey]) -> Vec<String> {
        keys.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_daily_skeleton_has_24_hours_in_order() {
        let keys = build_skeleton(Period::Daily, date("2024-10-01")).unwrap();
        assert_eq!(keys.len(), 24);
        assert_eq!(keys[0].to_string(), "0:00");
        assert_eq!(keys[8].to_string(), "8:00");
        assert_eq!(keys[23].to_string(), "23:00");
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_weekly_skeleton_starts_on_monday() {
        for reference in ["2024-09-30", "2024-10-02", "2024-10-06"] {
            let keys = build_skeleton(Period::Weekly, date(reference)).unwrap();
            assert_eq!(
                labels(&keys),
                vec![
                    "2024-09-30",
                    "2024-10-01",
                    "2024-10-02",
                    "2024-10-03",
                    "2024-10-04",
                    "2024-10-05",
                    "2024-10-06"
                ]
            );
        }
    }

    #[test]
    fn test_weekly_skeleton_across_year_end() {
        let keys = build_skeleton(Period::Weekly, date("2024-12-31")).unwrap();
        assert_eq!(keys.len(), 7);
        assert_eq!(keys.first().unwrap().to_string(), "2024-12-30");
        assert_eq!(keys.last().unwrap().to_string(), "2025-01-05");
    }

    #[test]
    fn test_monthly_skeleton_matches_day_count() {
        let cases = [
            ("2024-02-01", 29),
            ("2023-02-01", 28),
            ("2024-04-01", 30),
            ("2024-10-01", 31),
            ("2024-12-01", 31),
            ("1900-02-01", 28),
            ("2000-02-01", 29),
        ];
        for (reference, expected) in cases {
            let keys = build_skeleton(Period::Monthly, date(reference)).unwrap();
            assert_eq!(keys.len(), expected, "month of {}", reference);
        }
    }

    #[test]
    fn test_monthly_skeleton_uses_the_reference_month_from_any_day() {
        let keys = build_skeleton(Period::Monthly, date("2024-02-17")).unwrap();
        assert_eq!(keys.first().unwrap().to_string(), "2024-02-01");
        assert_eq!(keys.last().unwrap().to_string(), "2024-02-29");
    }

    #[test]
    fn test_window_for_december_rolls_into_january() {
        let w = window(Period::Monthly, date("2024-12-01"), FixedOffset::east_opt(0).unwrap())
            .unwrap();
        assert_eq!(w.start, Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(w.end, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(w.keys.len(), 31);
    }

    #[test]
    fn test_daily_window_respects_offset() {
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let w = window(Period::Daily, date("2024-10-01"), plus_two).unwrap();
        assert_eq!(w.start, Utc.with_ymd_and_hms(2024, 9, 30, 22, 0, 0).unwrap());
        assert_eq!(w.end, Utc.with_ymd_and_hms(2024, 10, 1, 22, 0, 0).unwrap());
    }

    #[test]
    fn test_weekly_window_is_half_open_seven_days() {
        let w = window(Period::Weekly, date("2024-10-03"), FixedOffset::east_opt(0).unwrap())
            .unwrap();
        assert_eq!(w.end - w.start, chrono::Duration::days(7));
        assert_eq!(w.start.weekday(), Weekday::Mon);
    }

    #[test]
    fn test_key_for_uses_local_offset() {
        let ts = Utc.with_ymd_and_hms(2024, 9, 30, 23, 30, 0).unwrap();
        let utc = FixedOffset::east_opt(0).unwrap();
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();

        assert_eq!(BucketExpr::HourOfDay.key_for(ts, utc), BucketKey::Hour(23));
        assert_eq!(BucketExpr::HourOfDay.key_for(ts, plus_two), BucketKey::Hour(1));
        assert_eq!(
            BucketExpr::Date.key_for(ts, plus_two),
            BucketKey::Day(date("2024-10-01"))
        );
    }

    #[test]
    fn test_parse_reference_for_each_period() {
        assert_eq!(
            Period::Daily.parse_reference(Some("2024-10-01")).unwrap(),
            date("2024-10-01")
        );
        assert_eq!(
            Period::Monthly.parse_reference(Some("2024-10")).unwrap(),
            date("2024-10-01")
        );
        assert_eq!(
            Period::Monthly.parse_reference(Some("2024-10-17")).unwrap(),
            date("2024-10-01")
        );
    }

    #[test]
    fn test_parse_reference_rejects_missing_and_malformed() {
        for raw in [None, Some(""), Some("   ")] {
            assert!(matches!(
                Period::Weekly.parse_reference(raw),
                Err(AppError::InvalidArgument(_))
            ));
        }
        for raw in ["2024-13-01", "2024-02-30", "yesterday", "2024-10"] {
            assert!(matches!(
                Period::Daily.parse_reference(Some(raw)),
                Err(AppError::InvalidArgument(_))
            ));
        }
        assert!(Period::Monthly.parse_reference(Some("2024-13")).is_err());
    }
}
