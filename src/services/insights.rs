//! Weekly usage insights.
//!
//! All analyses run over the week containing "today", where today is taken as
//! `now + TODAY_OFFSET_DAYS` so that samples stamped later on the current day are
//! still inside the window. When several buckets tie for a maximum, the first one in
//! canonical order wins: earliest hour, earliest date, or device declaration order.

use chrono::{DateTime, Days, FixedOffset, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::bucketing::{self, BucketExpr, BucketKey, DAYS_PER_WEEK};
use crate::error::{AppError, Result};
use crate::models::{Device, Insight};
use crate::repositories::{GroupedSum, StoreQuery, TimeRange, UsageStore};

/// Shift applied to the wall clock before picking the current week.
pub const TODAY_OFFSET_DAYS: u64 = 1;

/// A day's oven usage must exceed this to be reported as a spike.
pub const OVEN_SPIKE_THRESHOLD_KWH: f64 = 5.0;

#[derive(Debug, Clone, PartialEq)]
pub struct TopDevice {
    /// `None` when there was no usage this week.
    pub device: Option<Device>,
    pub total_kwh: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailySpike {
    pub date: NaiveDate,
    pub total_kwh: f64,
}

/// Derived facts for one week, before rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyInsights {
    pub week: TimeRange,
    pub top_device: TopDevice,
    pub peak_hour: Option<u32>,
    pub oven_spike: Option<DailySpike>,
    pub fridge_peak_hour: Option<u32>,
    /// Not rendered yet; kept for week-over-week comparisons.
    pub previous_week_total_kwh: f64,
}

#[derive(Clone)]
pub struct InsightService {
    store: Arc<dyn UsageStore>,
    offset: FixedOffset,
}

impl InsightService {
    pub fn new(store: Arc<dyn UsageStore>, offset: FixedOffset) -> Self {
        Self { store, offset }
    }

    pub async fn weekly(&self) -> Result<WeeklyInsights> {
        self.weekly_at(Utc::now()).await
    }

    pub async fn weekly_at(&self, now: DateTime<Utc>) -> Result<WeeklyInsights> {
        let today = now
            .checked_add_days(Days::new(TODAY_OFFSET_DAYS))
            .ok_or_else(|| clock_out_of_range(now))?;
        let week_start = bucketing::week_start(today.with_timezone(&self.offset).date_naive())
            .map_err(|_| clock_out_of_range(now))?;
        let start = bucketing::local_midnight(week_start, self.offset)
            .map_err(|_| clock_out_of_range(now))?;
        let previous_start = week_start
            .checked_sub_days(Days::new(DAYS_PER_WEEK))
            .and_then(|d| bucketing::local_midnight(d, self.offset).ok())
            .ok_or_else(|| clock_out_of_range(now))?;

        let week = TimeRange::new(start, today);
        let previous = TimeRange::new(previous_start, start);

        let hourly = StoreQuery::total(week)
            .bucketed(BucketExpr::HourOfDay)
            .per_device();
        let daily_oven = StoreQuery::total(week)
            .bucketed(BucketExpr::Date)
            .only(Device::Oven);
        let previous_total = StoreQuery::total(previous);

        let (hourly, daily_oven, previous_total) = tokio::try_join!(
            self.store.sum_grouped_by(&hourly),
            self.store.sum_grouped_by(&daily_oven),
            self.store.sum_grouped_by(&previous_total),
        )?;

        let insights = WeeklyInsights {
            week,
            top_device: top_device(&hourly),
            peak_hour: peak_hour(&hourly, None),
            oven_spike: oven_spike(&daily_oven),
            fridge_peak_hour: peak_hour(&hourly, Some(Device::Fridge)),
            previous_week_total_kwh: previous_total.iter().map(|r| r.total_kwh).sum(),
        };

        tracing::debug!(
            week_start = %week.start,
            previous_week_total_kwh = insights.previous_week_total_kwh,
            "Computed weekly insights"
        );
        Ok(insights)
    }
}

impl WeeklyInsights {
    /// The four statements shown to users, always in the same order.
    pub fn render(&self) -> Vec<Insight> {
        let top = match self.top_device.device {
            Some(device) => device.label(),
            None => "Unknown",
        };

        vec![
            Insight {
                emoji: "🔌",
                title: "Highest consuming device",
                insight: Some(format!("{} with {:.2} kWh", top, self.top_device.total_kwh)),
            },
            Insight {
                emoji: "⚡️",
                title: "Peak usage hour this week",
                insight: Some(match self.peak_hour {
                    Some(hour) => format!("{}:00", hour),
                    None => "N/A".to_string(),
                }),
            },
            Insight {
                emoji: "‼️",
                title: "Energy spikes",
                insight: self.oven_spike.as_ref().map(|spike| {
                    format!(
                        "Your oven's energy use spiked by {:.2} kWh on {}. Was it left on accidentally?",
                        spike.total_kwh,
                        spike.date.format("%Y-%m-%d")
                    )
                }),
            },
            Insight {
                emoji: "🔋",
                title: "Fridge peak usage",
                insight: self.fridge_peak_hour.map(|hour| {
                    format!(
                        "Your fridge consumes the most energy around {}:00. Consider adjusting settings to save power.",
                        hour
                    )
                }),
            },
        ]
    }
}

fn clock_out_of_range(now: DateTime<Utc>) -> AppError {
    AppError::Internal(format!("current week is not representable for {}", now))
}

fn top_device(hourly: &[GroupedSum]) -> TopDevice {
    let mut by_device: BTreeMap<Device, f64> = BTreeMap::new();
    for row in hourly {
        if let Some(device) = row.device {
            *by_device.entry(device).or_insert(0.0) += row.total_kwh;
        }
    }

    match first_max(by_device) {
        Some((device, total_kwh)) => TopDevice {
            device: Some(device),
            total_kwh,
        },
        None => TopDevice {
            device: None,
            total_kwh: 0.0,
        },
    }
}

/// Hour of day with the highest usage, optionally for one device only.
fn peak_hour(hourly: &[GroupedSum], device: Option<Device>) -> Option<u32> {
    let mut by_hour: BTreeMap<u32, f64> = BTreeMap::new();
    for row in hourly {
        if device.is_some() && row.device != device {
            continue;
        }
        if let Some(BucketKey::Hour(h)) = row.bucket {
            *by_hour.entry(h).or_insert(0.0) += row.total_kwh;
        }
    }
    first_max(by_hour).map(|(hour, _)| hour)
}

fn oven_spike(daily_oven: &[GroupedSum]) -> Option<DailySpike> {
    let by_day: BTreeMap<NaiveDate, f64> = daily_oven
        .iter()
        .filter_map(|row| match row.bucket {
            Some(BucketKey::Day(d)) => Some((d, row.total_kwh)),
            _ => None,
        })
        .collect();

    first_max(by_day)
        .filter(|(_, kwh)| *kwh > OVEN_SPIKE_THRESHOLD_KWH)
        .map(|(date, total_kwh)| DailySpike { date, total_kwh })
}

/// Largest value; ties go to the smallest key.
fn first_max<K: Ord>(values: BTreeMap<K, f64>) -> Option<(K, f64)> {
    values.into_iter().fold(None, |best, (k, v)| match best {
        Some((_, top)) if v <= top => best,
        _ => Some((k, v)),
    })
}
